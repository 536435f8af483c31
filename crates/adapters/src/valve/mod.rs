// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Valve transport adapters
//!
//! A transport sets a binary open/closed state on a numeric channel and may
//! report hardware state back asynchronously.

mod mqtt;
mod noop;

pub use mqtt::{channel_from_topic, parse_report, MqttTransport};
pub use noop::NoOpTransport;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, TransportCall};

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Errors from valve transport operations
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("publish to channel {channel} failed: {message}")]
    Publish { channel: u32, message: String },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// The state a valve channel is commanded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValveCommand {
    Open,
    Close,
}

impl ValveCommand {
    /// Wire payload for the command
    pub fn payload(&self) -> &'static str {
        match self {
            ValveCommand::Open => "1",
            ValveCommand::Close => "0",
        }
    }
}

impl fmt::Display for ValveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValveCommand::Open => write!(f, "open"),
            ValveCommand::Close => write!(f, "close"),
        }
    }
}

/// Hardware-reported channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: u32,
    pub open: bool,
}

/// Adapter for commanding valve channels
///
/// Implementations must not wait for hardware acknowledgement.
#[async_trait]
pub trait ValveTransport: Clone + Send + Sync + 'static {
    /// Command a channel open or closed
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError>;
}
