// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use chrono::{DateTime, Utc};
use spk_core::{DayOption, Operation, TriggerKey};
use std::collections::BTreeMap;

/// A persisted recurring rule and its next planned fire time
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrigger {
    pub rule: DayOption,
    pub next_fire: Option<DateTime<Utc>>,
}

/// Materialized state built from WAL operations
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub triggers: BTreeMap<TriggerKey, StoredTrigger>,
}

impl MaterializedState {
    /// Build state by applying `ops` in order
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut state = Self::default();
        for op in ops {
            state.apply(op);
        }
        state
    }

    /// Apply an operation to update the state
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::TriggerSave {
                key,
                rule,
                next_fire,
            } => {
                self.triggers.insert(
                    key.clone(),
                    StoredTrigger {
                        rule: rule.clone(),
                        next_fire: *next_fire,
                    },
                );
            }

            Operation::TriggerRemove { key } => {
                self.triggers.remove(key);
            }

            // A reschedule for a rule that was since removed is a no-op
            Operation::TriggerReschedule { key, next_fire } => {
                if let Some(trigger) = self.triggers.get_mut(key) {
                    trigger.next_fire = Some(*next_fire);
                }
            }
        }
    }

    /// The minimal operation sequence that reproduces this state
    pub fn snapshot(&self) -> Vec<Operation> {
        self.triggers
            .iter()
            .map(|(key, trigger)| Operation::TriggerSave {
                key: key.clone(),
                rule: trigger.rule.clone(),
                next_fire: trigger.next_fire,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
