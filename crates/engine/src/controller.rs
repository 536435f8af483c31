// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control surface for an API layer: manual zone runs, zone listing,
//! trigger management and shutdown

use crate::activation::Activation;
use crate::error::EngineError;
use crate::registry::ZoneRegistry;
use crate::scheduler::{Scheduler, TriggerInfo};
use crate::valve::ValveStatus;
use spk_adapters::{ChannelReport, ValveTransport};
use spk_core::{Clock, DayOption, ProgramId, Step, TriggerKey, ZoneId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct Controller<T: ValveTransport, C: Clock> {
    registry: Arc<ZoneRegistry<T>>,
    scheduler: Scheduler<T, C>,
    default_run: Duration,
    /// Manual activations by zone; at most one per zone
    manual: Mutex<HashMap<ZoneId, Activation<T>>>,
}

impl<T: ValveTransport, C: Clock> Controller<T, C> {
    pub fn new(
        registry: Arc<ZoneRegistry<T>>,
        scheduler: Scheduler<T, C>,
        default_run: Duration,
    ) -> Self {
        Self {
            registry,
            scheduler,
            default_run,
            manual: Mutex::new(HashMap::new()),
        }
    }

    pub fn scheduler(&self) -> &Scheduler<T, C> {
        &self.scheduler
    }

    pub fn registry(&self) -> &Arc<ZoneRegistry<T>> {
        &self.registry
    }

    /// Run `zone` for `seconds` (config default when `None`), clamped to the
    /// failsafe ceiling. A manual run already on the zone is stopped first.
    pub async fn activate_zone(
        &self,
        zone: ZoneId,
        seconds: Option<u64>,
    ) -> Result<Activation<T>, EngineError> {
        let valve = self
            .registry
            .get(zone)
            .ok_or(EngineError::ZoneNotFound(zone))?;
        let seconds = seconds.unwrap_or(self.default_run.as_secs());
        let run = Activation::new(valve, seconds);

        let previous = {
            let mut manual = self.manual.lock().unwrap_or_else(|e| e.into_inner());
            manual.retain(|_, run| !run.is_finished());
            manual.insert(zone, run.clone())
        };
        if let Some(previous) = previous {
            tracing::info!(zone = %zone, "replacing running manual activation");
            previous.stop().await;
        }

        run.start().await?;
        Ok(run)
    }

    /// Close `zone` now, ending the run driving it. A program step that is
    /// stopped this way ends `Terminated` and its program moves on.
    pub async fn deactivate_zone(&self, zone: ZoneId) -> Result<(), EngineError> {
        let valve = self
            .registry
            .get(zone)
            .ok_or(EngineError::ZoneNotFound(zone))?;
        let manual = self
            .manual
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&zone);

        let mut stopped = false;
        for run in manual.into_iter().chain(valve.driver()) {
            stopped |= run.stop().await;
        }
        if !stopped {
            valve.close().await;
        }
        Ok(())
    }

    /// Every zone with on/off state and remaining seconds
    pub fn zones(&self) -> Vec<ValveStatus> {
        self.registry.statuses()
    }

    pub fn register_recurring(&self, rule: DayOption) -> Result<TriggerKey, EngineError> {
        self.scheduler.register_recurring(rule)
    }

    pub fn register_adhoc(
        &self,
        steps: Option<Vec<Step>>,
        program_id: Option<ProgramId>,
        name: impl Into<String>,
    ) -> Result<TriggerKey, EngineError> {
        self.scheduler.register_adhoc(steps, program_id, name)
    }

    pub fn remove_trigger(&self, key: &TriggerKey) -> Result<(), EngineError> {
        self.scheduler.remove(key)
    }

    pub fn trigger_now(&self, key: &TriggerKey) -> Result<(), EngineError> {
        self.scheduler.trigger_now(key)
    }

    pub fn triggers(&self) -> Vec<TriggerInfo> {
        self.scheduler.list()
    }

    /// Log a hardware confirmation against local state. Local state is
    /// never changed by a confirmation.
    pub fn record_confirmation(&self, report: &ChannelReport) {
        let Some(valve) = self.registry.by_channel(report.channel) else {
            tracing::debug!(channel = report.channel, "confirmation for unknown channel");
            return;
        };
        let commanded = valve.is_open();
        if commanded == report.open {
            tracing::debug!(zone = %valve.id(), open = report.open, "state confirmed");
        } else {
            tracing::warn!(
                zone = %valve.id(),
                reported = report.open,
                commanded,
                "hardware state differs from commanded state"
            );
        }
    }

    /// Stop dispatch, end every run this process started, and close all
    /// valves
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;

        let manual: Vec<_> = self
            .manual
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, run)| run)
            .collect();
        for run in manual {
            run.stop().await;
        }

        self.registry.close_all().await;
        tracing::info!("all valves closed");
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
