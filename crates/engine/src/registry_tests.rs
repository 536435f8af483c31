// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use spk_adapters::{FakeTransport, ValveCommand};
use std::time::Duration;

fn registry(transport: &FakeTransport) -> ZoneRegistry<FakeTransport> {
    ZoneRegistry::new(
        vec![
            Zone::new(2, "Side", 32),
            Zone::new(1, "Front", 31),
            Zone::new(1, "Duplicate", 99),
        ],
        transport.clone(),
        Failsafe::default(),
    )
}

#[test]
fn lookup_by_id_and_channel() {
    let registry = registry(&FakeTransport::new());

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get(ZoneId(1)).unwrap().zone().name, "Front");
    assert!(registry.get(ZoneId(7)).is_none());
    assert_eq!(registry.by_channel(32).unwrap().id(), ZoneId(2));
    assert!(registry.by_channel(99).is_none());
}

#[test]
fn statuses_are_ordered_by_id() {
    let registry = registry(&FakeTransport::new());

    let ids: Vec<_> = registry.statuses().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![ZoneId(1), ZoneId(2)]);
}

#[tokio::test]
async fn close_all_closes_every_valve() {
    let transport = FakeTransport::new();
    let registry = registry(&transport);
    for valve in registry.valves() {
        valve.open(Duration::from_secs(10)).await.unwrap();
    }

    registry.close_all().await;

    assert!(transport.open_channels().is_empty());
    assert_eq!(transport.count(31, ValveCommand::Close), 1);
    assert_eq!(transport.count(32, ValveCommand::Close), 1);
    assert!(registry.statuses().iter().all(|s| !s.on));
}
