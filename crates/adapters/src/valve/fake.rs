// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake valve transport for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{TransportError, ValveCommand, ValveTransport};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

/// Recorded transport command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportCall {
    pub channel: u32,
    pub command: ValveCommand,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<TransportCall>,
    open: BTreeSet<u32>,
    max_open: usize,
    failing: HashSet<(u32, ValveCommand)>,
}

/// Fake transport that records commands and tracks which channels are open
#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls, including failed attempts
    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calls.clone()
    }

    /// Number of times `command` was sent to `channel`
    pub fn count(&self, channel: u32, command: ValveCommand) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .iter()
            .filter(|c| c.channel == channel && c.command == command)
            .count()
    }

    /// Channels whose last successful command was open
    pub fn open_channels(&self) -> Vec<u32> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .open
            .iter()
            .copied()
            .collect()
    }

    /// Highest number of channels that were ever open at the same time
    pub fn max_concurrently_open(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).max_open
    }

    /// Make every `command` on `channel` fail from now on
    pub fn fail_on(&self, channel: u32, command: ValveCommand) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .failing
            .insert((channel, command));
    }
}

#[async_trait]
impl ValveTransport for FakeTransport {
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.calls.push(TransportCall { channel, command });

        if state.failing.contains(&(channel, command)) {
            return Err(TransportError::Publish {
                channel,
                message: "injected failure".to_string(),
            });
        }

        match command {
            ValveCommand::Open => {
                state.open.insert(channel);
                state.max_open = state.max_open.max(state.open.len());
            }
            ValveCommand::Close => {
                state.open.remove(&channel);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
