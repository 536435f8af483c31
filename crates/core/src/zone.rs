// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zone identity and the failsafe ceiling

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Numeric identifier for an irrigation zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ZoneId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// One physical valve: identity, display name and transport channel.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub channel: u32,
}

impl Zone {
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>, channel: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            channel,
        }
    }
}

/// Maximum time any single activation may keep a valve open.
///
/// Requests above the ceiling are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failsafe {
    ceiling: Duration,
}

impl Failsafe {
    pub const DEFAULT_CEILING: Duration = Duration::from_secs(1800);

    pub fn new(ceiling: Duration) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// Clamp a requested duration to the ceiling
    pub fn clamp(&self, requested: Duration) -> Duration {
        requested.min(self.ceiling)
    }

    /// Clamp a requested duration in whole seconds
    pub fn clamp_secs(&self, requested: u64) -> u64 {
        requested.min(self.ceiling.as_secs())
    }
}

impl Default for Failsafe {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CEILING)
    }
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod tests;
