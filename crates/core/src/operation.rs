// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable operations recorded by the trigger store

use crate::trigger::{DayOption, TriggerKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted change to the set of recurring triggers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Install or replace the rule stored under `key`
    TriggerSave {
        key: TriggerKey,
        rule: DayOption,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        next_fire: Option<DateTime<Utc>>,
    },
    /// Drop the rule stored under `key`
    TriggerRemove { key: TriggerKey },
    /// Move the next fire time of an existing rule
    TriggerReschedule {
        key: TriggerKey,
        next_fire: DateTime<Utc>,
    },
}

impl Operation {
    pub fn key(&self) -> &TriggerKey {
        match self {
            Operation::TriggerSave { key, .. }
            | Operation::TriggerRemove { key }
            | Operation::TriggerReschedule { key, .. } => key,
        }
    }
}
