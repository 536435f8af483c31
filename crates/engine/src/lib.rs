// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Sprinkler run-control engine: valves, timed activations, programs and
//! the trigger scheduler

mod activation;
mod controller;
mod error;
mod program;
mod registry;
mod scheduler;
mod valve;

pub use activation::Activation;
pub use controller::Controller;
pub use error::{ActivationError, EngineError};
pub use program::{Pacing, Program, ProgramLookup, StaticPrograms, StepOutcome};
pub use registry::ZoneRegistry;
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerDeps, TriggerInfo};
pub use valve::{Valve, ValveStatus};
