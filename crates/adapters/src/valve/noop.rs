// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-only transport for dummy mode.

use super::{TransportError, ValveCommand, ValveTransport};
use async_trait::async_trait;

/// Transport that only logs commands.
///
/// Used when the daemon runs without hardware (`engine.dummy = true`).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTransport;

impl NoOpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ValveTransport for NoOpTransport {
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError> {
        tracing::info!(channel, %command, "[DUMMY] valve command");
        Ok(())
    }
}
