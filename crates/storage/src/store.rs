// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger persistence
//!
//! Only recurring rules are stored. One-off runs live in scheduler memory
//! and never reach a store.

use crate::state::{MaterializedState, StoredTrigger};
use crate::wal::{Wal, WalError};
use chrono::{DateTime, Utc};
use spk_core::{DayOption, Operation, TriggerKey};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wal: {0}")]
    Wal(#[from] WalError),
    #[error("no stored trigger {0}")]
    NotFound(TriggerKey),
}

/// Durable home for recurring triggers
pub trait TriggerStore: Send + Sync + 'static {
    /// Insert or replace the rule at `key`
    fn save(
        &self,
        key: &TriggerKey,
        rule: &DayOption,
        next_fire: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Remove the rule at `key`
    fn remove(&self, key: &TriggerKey) -> Result<(), StoreError>;

    /// Record a new next fire time for an existing rule
    fn reschedule(&self, key: &TriggerKey, next_fire: DateTime<Utc>) -> Result<(), StoreError>;

    /// All stored rules, ordered by key
    fn list(&self) -> Vec<(TriggerKey, StoredTrigger)>;
}

struct WalInner {
    wal: Wal,
    state: MaterializedState,
}

/// Entries a log may hold before compaction is considered
const COMPACT_FLOOR: u64 = 32;

impl WalInner {
    fn commit(&mut self, op: Operation) -> Result<(), StoreError> {
        self.wal.append(&op)?;
        self.state.apply(&op);
        self.maybe_compact();
        Ok(())
    }

    /// Rewrite the log once it holds more than twice the live entries.
    /// The appended entry is already durable, so failure is only logged.
    fn maybe_compact(&mut self) {
        let live = self.state.triggers.len() as u64;
        if self.wal.sequence() <= COMPACT_FLOOR.max(live * 2) {
            return;
        }
        let before = self.wal.sequence();
        match self.wal.rewrite(&self.state.snapshot()) {
            Ok(()) => tracing::debug!(before, after = self.wal.sequence(), "compacted trigger log"),
            Err(e) => tracing::warn!(error = %e, "trigger log compaction failed"),
        }
    }
}

/// Trigger store backed by a JSON-lines write-ahead log
pub struct WalTriggerStore {
    inner: Mutex<WalInner>,
}

impl WalTriggerStore {
    /// Open the log at `path`, replay it, and compact it to one entry per
    /// live rule
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let ops = Wal::replay(path)?;
        let state = MaterializedState::from_ops(&ops);
        let mut wal = Wal::open(path)?;

        let snapshot = state.snapshot();
        if snapshot.len() < ops.len() {
            wal.rewrite(&snapshot)?;
            tracing::info!(
                path = %path.display(),
                before = ops.len(),
                after = snapshot.len(),
                "compacted trigger log"
            );
        }

        tracing::debug!(triggers = state.triggers.len(), "trigger store opened");
        Ok(Self {
            inner: Mutex::new(WalInner { wal, state }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WalInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TriggerStore for WalTriggerStore {
    fn save(
        &self,
        key: &TriggerKey,
        rule: &DayOption,
        next_fire: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.lock().commit(Operation::TriggerSave {
            key: key.clone(),
            rule: rule.clone(),
            next_fire,
        })
    }

    fn remove(&self, key: &TriggerKey) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.state.triggers.contains_key(key) {
            return Err(StoreError::NotFound(key.clone()));
        }
        inner.commit(Operation::TriggerRemove { key: key.clone() })
    }

    fn reschedule(&self, key: &TriggerKey, next_fire: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.state.triggers.contains_key(key) {
            return Err(StoreError::NotFound(key.clone()));
        }
        inner.commit(Operation::TriggerReschedule {
            key: key.clone(),
            next_fire,
        })
    }

    fn list(&self) -> Vec<(TriggerKey, StoredTrigger)> {
        self.lock()
            .state
            .triggers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// In-memory trigger store, used when no state directory is configured
#[derive(Clone, Default)]
pub struct MemoryTriggerStore {
    state: Arc<Mutex<MaterializedState>>,
}

impl MemoryTriggerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(&self, op: Operation) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(&op);
    }

    fn contains(&self, key: &TriggerKey) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .triggers
            .contains_key(key)
    }
}

impl TriggerStore for MemoryTriggerStore {
    fn save(
        &self,
        key: &TriggerKey,
        rule: &DayOption,
        next_fire: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.apply(Operation::TriggerSave {
            key: key.clone(),
            rule: rule.clone(),
            next_fire,
        });
        Ok(())
    }

    fn remove(&self, key: &TriggerKey) -> Result<(), StoreError> {
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.clone()));
        }
        self.apply(Operation::TriggerRemove { key: key.clone() });
        Ok(())
    }

    fn reschedule(&self, key: &TriggerKey, next_fire: DateTime<Utc>) -> Result<(), StoreError> {
        if !self.contains(key) {
            return Err(StoreError::NotFound(key.clone()));
        }
        self.apply(Operation::TriggerReschedule {
            key: key.clone(),
            next_fire,
        });
        Ok(())
    }

    fn list(&self) -> Vec<(TriggerKey, StoredTrigger)> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .triggers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
