// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::program::{Pacing, StaticPrograms};
use crate::scheduler::{SchedulerConfig, SchedulerDeps};
use spk_adapters::{FakeTransport, ValveCommand};
use spk_core::{Failsafe, FakeClock, RunState, StartTime, Zone};
use spk_storage::MemoryTriggerStore;

fn controller(transport: &FakeTransport) -> Controller<FakeTransport, FakeClock> {
    let registry = Arc::new(ZoneRegistry::new(
        vec![Zone::new(1, "Front", 31), Zone::new(2, "Side", 32)],
        transport.clone(),
        Failsafe::new(Duration::from_secs(600)),
    ));
    let scheduler = Scheduler::new(
        SchedulerDeps {
            registry: Arc::clone(&registry),
            programs: Arc::new(StaticPrograms::default()),
            store: Arc::new(MemoryTriggerStore::new()),
            clock: FakeClock::new(),
        },
        SchedulerConfig {
            poll_interval: Duration::from_secs(1),
            pacing: Pacing::default(),
        },
    );
    Controller::new(registry, scheduler, Duration::from_secs(60))
}

#[tokio::test(start_paused = true)]
async fn activate_uses_default_duration() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);

    let run = controller.activate_zone(ZoneId(1), None).await.unwrap();

    assert_eq!(run.duration(), 60);
    assert_eq!(transport.open_channels(), vec![31]);
}

#[tokio::test(start_paused = true)]
async fn activate_clamps_to_failsafe() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);

    let run = controller.activate_zone(ZoneId(1), Some(99_999)).await.unwrap();

    assert_eq!(run.duration(), 600);
}

#[tokio::test(start_paused = true)]
async fn activate_unknown_zone_errors() {
    let controller = controller(&FakeTransport::new());

    let result = controller.activate_zone(ZoneId(9), Some(10)).await;

    assert!(matches!(result, Err(EngineError::ZoneNotFound(ZoneId(9)))));
}

#[tokio::test(start_paused = true)]
async fn reactivating_replaces_previous_run() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);

    let first = controller.activate_zone(ZoneId(1), Some(100)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    let second = controller.activate_zone(ZoneId(1), Some(20)).await.unwrap();

    assert_eq!(first.state(), RunState::Terminated);
    assert_eq!(second.state(), RunState::Running);
    assert_eq!(transport.open_channels(), vec![31]);

    let status = &controller.zones()[0];
    assert!(status.on);
    assert_eq!(status.remaining, Some(20));
}

#[tokio::test(start_paused = true)]
async fn zones_list_reports_remaining_time() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);

    controller.activate_zone(ZoneId(2), Some(10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    let zones = controller.zones();
    assert_eq!(zones.len(), 2);
    assert!(!zones[0].on);
    assert_eq!(zones[0].remaining, None);
    assert!(zones[1].on);
    assert_eq!(zones[1].remaining, Some(7));

    tokio::time::sleep(Duration::from_secs(10)).await;
    let zones = controller.zones();
    assert!(!zones[1].on);
    assert_eq!(zones[1].remaining, None);
}

#[tokio::test(start_paused = true)]
async fn deactivate_stops_manual_run() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);
    let run = controller.activate_zone(ZoneId(1), Some(30)).await.unwrap();

    controller.deactivate_zone(ZoneId(1)).await.unwrap();

    assert_eq!(run.state(), RunState::Terminated);
    assert!(transport.open_channels().is_empty());
    assert_eq!(transport.count(31, ValveCommand::Close), 1);
}

#[tokio::test(start_paused = true)]
async fn deactivate_ends_program_step_and_program_moves_on() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);
    let key = controller
        .register_adhoc(Some(vec![Step::new(1, 60), Step::new(2, 5)]), None, "soak")
        .unwrap();
    controller.trigger_now(&key).unwrap();
    controller.scheduler().dispatch_due();
    tokio::time::sleep(Duration::from_secs(10)).await;
    let step = controller.registry().get(ZoneId(1)).unwrap().driver().unwrap();

    controller.deactivate_zone(ZoneId(1)).await.unwrap();

    assert_eq!(step.state(), RunState::Terminated);
    let front = &controller.zones()[0];
    assert!(!front.on);
    assert_eq!(front.remaining, None);
    assert_eq!(transport.count(31, ValveCommand::Close), 1);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(transport.count(32, ValveCommand::Open), 1);
}

#[tokio::test(start_paused = true)]
async fn deactivate_idle_zone_still_closes() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);

    controller.deactivate_zone(ZoneId(2)).await.unwrap();

    assert_eq!(transport.count(32, ValveCommand::Close), 1);
    assert!(matches!(
        controller.deactivate_zone(ZoneId(5)).await,
        Err(EngineError::ZoneNotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn confirmations_never_override_local_state() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);
    controller.activate_zone(ZoneId(1), Some(30)).await.unwrap();

    controller.record_confirmation(&ChannelReport {
        channel: 31,
        open: false,
    });
    controller.record_confirmation(&ChannelReport {
        channel: 77,
        open: true,
    });

    assert!(controller.zones()[0].on);
}

#[tokio::test(start_paused = true)]
async fn trigger_passthrough() {
    let controller = controller(&FakeTransport::new());
    let rule = DayOption::new("m", StartTime::new(6, 0).unwrap()).steps(vec![Step::new(1, 5)]);

    let key = controller.register_recurring(rule).unwrap();
    controller.trigger_now(&key).unwrap();
    assert_eq!(controller.triggers().len(), 1);

    controller.remove_trigger(&key).unwrap();
    assert!(controller.triggers().is_empty());
    assert!(controller.remove_trigger(&key).is_err());
}

#[tokio::test(start_paused = true)]
async fn shutdown_closes_every_valve() {
    let transport = FakeTransport::new();
    let controller = controller(&transport);
    let run = controller.activate_zone(ZoneId(1), Some(300)).await.unwrap();
    controller
        .register_adhoc(Some(vec![Step::new(2, 300)]), None, "adhoc")
        .unwrap();

    controller.shutdown().await;

    assert_eq!(run.state(), RunState::Terminated);
    assert!(transport.open_channels().is_empty());
    assert!(controller.zones().iter().all(|z| !z.on));
}
