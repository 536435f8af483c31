// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! spk-core: Core types for the sprinkler run-control engine
//!
//! This crate provides:
//! - Zone identity and the failsafe ceiling
//! - Program definitions and activation run states
//! - Recurring trigger rules with deterministic keys and next-fire computation
//! - Durable trigger-store operations
//! - TOML configuration

pub mod clock;
pub mod config;
pub mod operation;
pub mod program;
pub mod run;
pub mod trigger;
pub mod zone;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{Config, ConfigError};
pub use operation::Operation;
pub use program::{ProgramDef, ProgramId, Step};
pub use run::RunState;
pub use trigger::{DayFilter, DayOption, StartTime, TriggerError, TriggerKey};
pub use zone::{Failsafe, Zone, ZoneId};
