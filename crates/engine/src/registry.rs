// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zone registry: the valves known to this process, built once at startup

use crate::valve::{Valve, ValveStatus};
use spk_adapters::ValveTransport;
use spk_core::{Failsafe, Zone, ZoneId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable lookup from zone id to valve
pub struct ZoneRegistry<T> {
    valves: BTreeMap<ZoneId, Arc<Valve<T>>>,
    failsafe: Failsafe,
}

impl<T: ValveTransport> ZoneRegistry<T> {
    /// Build one valve per zone, all sharing `transport`.
    ///
    /// A repeated zone id keeps the first definition.
    pub fn new(zones: impl IntoIterator<Item = Zone>, transport: T, failsafe: Failsafe) -> Self {
        let mut valves = BTreeMap::new();
        for zone in zones {
            if valves.contains_key(&zone.id) {
                tracing::warn!(zone = %zone.id, "duplicate zone ignored");
                continue;
            }
            valves.insert(
                zone.id,
                Arc::new(Valve::new(zone, transport.clone(), failsafe)),
            );
        }
        Self { valves, failsafe }
    }

    pub fn get(&self, id: ZoneId) -> Option<Arc<Valve<T>>> {
        self.valves.get(&id).cloned()
    }

    pub fn contains(&self, id: ZoneId) -> bool {
        self.valves.contains_key(&id)
    }

    pub fn failsafe(&self) -> Failsafe {
        self.failsafe
    }

    pub fn len(&self) -> usize {
        self.valves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valves.is_empty()
    }

    pub fn valves(&self) -> impl Iterator<Item = &Arc<Valve<T>>> {
        self.valves.values()
    }

    /// Status of every zone, ordered by id
    pub fn statuses(&self) -> Vec<ValveStatus> {
        self.valves.values().map(|v| v.status()).collect()
    }

    /// Valve for a hardware channel, used to match confirmations
    pub fn by_channel(&self, channel: u32) -> Option<Arc<Valve<T>>> {
        self.valves
            .values()
            .find(|v| v.zone().channel == channel)
            .cloned()
    }

    /// Command every valve closed
    pub async fn close_all(&self) {
        for valve in self.valves.values() {
            valve.close().await;
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
