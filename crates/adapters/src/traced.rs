// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrapper for consistent observability

use crate::valve::{TransportError, ValveCommand, ValveTransport};
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any ValveTransport
#[derive(Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: ValveTransport> ValveTransport for TracedTransport<T> {
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError> {
        let span = tracing::info_span!("valve.set", channel, command = %command);

        async move {
            tracing::debug!("sending");

            let start = std::time::Instant::now();
            let result = self.inner.set_channel(channel, command).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "sent"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "send failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
