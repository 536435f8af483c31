// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activation run states
//!
//! ```text
//! Scheduled ──start──▶ Running ──countdown 0──▶ Completed
//!     │                   ├──────stop─────────▶ Terminated
//!     └──open failed──────┴───────────────────▶ Failed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a single timed valve activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Constructed, not yet started
    Scheduled,
    /// Countdown active, valve commanded open
    Running,
    /// Countdown reached zero
    Completed,
    /// Stopped externally before the countdown reached zero
    Terminated,
    /// Opening the valve failed
    Failed,
}

impl RunState {
    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Terminated | RunState::Failed
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Scheduled => write!(f, "scheduled"),
            RunState::Running => write!(f, "running"),
            RunState::Completed => write!(f, "completed"),
            RunState::Terminated => write!(f, "terminated"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(RunState::Scheduled),
            "running" => Ok(RunState::Running),
            "completed" => Ok(RunState::Completed),
            "terminated" => Ok(RunState::Terminated),
            "failed" => Ok(RunState::Failed),
            _ => Err(format!("unknown run state: {}", s)),
        }
    }
}
