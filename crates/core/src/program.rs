// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Program definitions: ordered per-zone timed steps

use crate::zone::ZoneId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a program definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl ProgramId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProgramId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProgramId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One program step: water `zone` for `seconds`.
///
/// Serialized as a `[zone, seconds]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(ZoneId, u64)", into = "(ZoneId, u64)")]
pub struct Step {
    pub zone: ZoneId,
    pub seconds: u64,
}

impl Step {
    pub fn new(zone: impl Into<ZoneId>, seconds: u64) -> Self {
        Self {
            zone: zone.into(),
            seconds,
        }
    }
}

impl From<(ZoneId, u64)> for Step {
    fn from((zone, seconds): (ZoneId, u64)) -> Self {
        Self { zone, seconds }
    }
}

impl From<Step> for (ZoneId, u64) {
    fn from(step: Step) -> Self {
        (step.zone, step.seconds)
    }
}

/// A named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDef {
    pub id: ProgramId,
    pub name: String,
    pub steps: Vec<Step>,
}

impl ProgramDef {
    pub fn new(id: impl Into<ProgramId>, name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps,
        }
    }

    /// Total requested watering time, before failsafe clamping
    pub fn total_seconds(&self) -> u64 {
        self.steps.iter().map(|s| s.seconds).sum()
    }
}
