// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Valve actor: one physical zone and its last commanded state

use crate::activation::{Activation, Driver, Shared};
use chrono::{DateTime, Local};
use serde::Serialize;
use spk_adapters::{TransportError, ValveCommand, ValveTransport};
use spk_core::{Clock, Failsafe, SystemClock, Zone, ZoneId};
use std::sync::Mutex;
use std::time::Duration;

/// Snapshot of a valve for listing zones
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValveStatus {
    pub id: ZoneId,
    pub name: String,
    pub channel: u32,
    pub on: bool,
    /// Seconds left on the activation currently driving this valve
    pub remaining: Option<u64>,
    pub last_opened_at: Option<DateTime<Local>>,
    pub last_closed_at: Option<DateTime<Local>>,
}

struct ValveState<T> {
    is_open: bool,
    last_opened_at: Option<DateTime<Local>>,
    last_closed_at: Option<DateTime<Local>>,
    driver: Option<Driver<T>>,
}

impl<T> Default for ValveState<T> {
    fn default() -> Self {
        Self {
            is_open: false,
            last_opened_at: None,
            last_closed_at: None,
            driver: None,
        }
    }
}

/// One zone bound to a transport.
///
/// `is_open` is the last state this process commanded, not a hardware
/// confirmation.
pub struct Valve<T> {
    zone: Zone,
    transport: T,
    failsafe: Failsafe,
    state: Mutex<ValveState<T>>,
}

impl<T: ValveTransport> Valve<T> {
    pub fn new(zone: Zone, transport: T, failsafe: Failsafe) -> Self {
        Self {
            zone,
            transport,
            failsafe,
            state: Mutex::new(ValveState::default()),
        }
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn id(&self) -> ZoneId {
        self.zone.id
    }

    pub fn failsafe(&self) -> Failsafe {
        self.failsafe
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ValveState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Command the channel open. The hint is clamped and only logged.
    pub async fn open(&self, duration_hint: Duration) -> Result<(), TransportError> {
        let seconds = self.failsafe.clamp(duration_hint).as_secs();
        tracing::info!(
            zone = %self.zone.id,
            name = %self.zone.name,
            channel = self.zone.channel,
            seconds,
            "opening valve"
        );

        if let Err(e) = self
            .transport
            .set_channel(self.zone.channel, ValveCommand::Open)
            .await
        {
            tracing::error!(zone = %self.zone.id, error = %e, "valve open failed");
            return Err(e);
        }

        let mut state = self.lock();
        state.is_open = true;
        state.last_opened_at = Some(SystemClock.now());
        Ok(())
    }

    /// Command the channel closed. Always re-sends; transport errors are
    /// logged and the valve is recorded closed regardless.
    pub async fn close(&self) {
        tracing::info!(
            zone = %self.zone.id,
            name = %self.zone.name,
            channel = self.zone.channel,
            "closing valve"
        );

        if let Err(e) = self
            .transport
            .set_channel(self.zone.channel, ValveCommand::Close)
            .await
        {
            tracing::error!(zone = %self.zone.id, error = %e, "valve close failed");
        }

        let mut state = self.lock();
        state.is_open = false;
        state.last_closed_at = Some(SystemClock.now());
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_open
    }

    /// Record `driver` as the run now driving this valve
    pub(crate) fn attach(&self, driver: Driver<T>) {
        self.lock().driver = Some(driver);
    }

    /// Clear the driver, but only if `run` is still the one attached
    pub(crate) fn detach(&self, run: &Shared<T>) {
        let mut state = self.lock();
        if state.driver.as_ref().is_some_and(|d| d.is(run)) {
            state.driver = None;
        }
    }

    /// The activation currently driving this valve, manual or program step
    pub fn driver(&self) -> Option<Activation<T>> {
        self.lock().driver.as_ref().and_then(Driver::activation)
    }

    /// Seconds left on the driving activation, if any
    pub fn remaining(&self) -> Option<u64> {
        self.lock().driver.as_ref().and_then(Driver::remaining)
    }

    pub fn status(&self) -> ValveStatus {
        let state = self.lock();
        ValveStatus {
            id: self.zone.id,
            name: self.zone.name.clone(),
            channel: self.zone.channel,
            on: state.is_open,
            remaining: state.driver.as_ref().and_then(Driver::remaining),
            last_opened_at: state.last_opened_at,
            last_closed_at: state.last_closed_at,
        }
    }
}

#[cfg(test)]
#[path = "valve_tests.rs"]
mod tests;
