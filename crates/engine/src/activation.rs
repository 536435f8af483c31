// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timed activation of a single valve
//!
//! An activation moves `Scheduled -> Running -> {Completed | Terminated |
//! Failed}`. The countdown tick and every completion-triggering call go
//! through one per-activation lock, and the finish path only ever runs once:
//! it marks the run inactive, cancels the countdown, closes the valve, sets
//! the terminal state, then signals completion.

use crate::error::ActivationError;
use crate::valve::Valve;
use chrono::{DateTime, Local};
use spk_adapters::ValveTransport;
use spk_core::{Clock, RunState, SystemClock, ZoneId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const TICK: Duration = Duration::from_secs(1);

/// Handle to one timed open interval. Clones share the same run.
pub struct Activation<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Activation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

pub(crate) struct Shared<T> {
    valve: Arc<Valve<T>>,
    duration: u64,
    remaining: Arc<AtomicU64>,
    active: AtomicBool,
    created_at: DateTime<Local>,
    started_at: Mutex<Option<DateTime<Local>>>,
    /// Serializes ticks and transitions
    countdown: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Current state; a terminal value is the completion signal
    state: watch::Sender<RunState>,
}

/// Non-owning link from a valve to the run driving it
pub(crate) struct Driver<T> {
    run: Weak<Shared<T>>,
}

impl<T> Driver<T> {
    pub(crate) fn is(&self, run: &Shared<T>) -> bool {
        std::ptr::eq(self.run.as_ptr(), run)
    }

    pub(crate) fn remaining(&self) -> Option<u64> {
        self.run
            .upgrade()
            .map(|shared| shared.remaining.load(Ordering::SeqCst))
    }

    pub(crate) fn activation(&self) -> Option<Activation<T>> {
        self.run.upgrade().map(|shared| Activation { shared })
    }
}

impl<T: ValveTransport> Activation<T> {
    /// Create a run for `seconds`, clamped to the valve's failsafe ceiling
    pub fn new(valve: Arc<Valve<T>>, seconds: u64) -> Self {
        let duration = valve.failsafe().clamp_secs(seconds);
        if duration < seconds {
            tracing::warn!(
                zone = %valve.id(),
                requested = seconds,
                ceiling = duration,
                "duration clamped to failsafe ceiling"
            );
        }
        let (state, _) = watch::channel(RunState::Scheduled);
        Self {
            shared: Arc::new(Shared {
                valve,
                duration,
                remaining: Arc::new(AtomicU64::new(duration)),
                active: AtomicBool::new(false),
                created_at: SystemClock.now(),
                started_at: Mutex::new(None),
                countdown: tokio::sync::Mutex::new(None),
                state,
            }),
        }
    }

    pub fn zone(&self) -> ZoneId {
        self.shared.valve.id()
    }

    /// Committed duration in seconds, after clamping
    pub fn duration(&self) -> u64 {
        self.shared.duration
    }

    pub fn remaining(&self) -> u64 {
        self.shared.remaining.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        *self.shared.state.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.shared.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        *self
            .shared
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Arm the countdown and open the valve.
    ///
    /// On open failure the run finishes as `Failed` (closing the valve and
    /// signalling completion) before the error is returned.
    pub async fn start(&self) -> Result<(), ActivationError> {
        let shared = &self.shared;
        let mut countdown = shared.countdown.lock().await;

        if self.state() != RunState::Scheduled {
            return Err(ActivationError::AlreadyStarted { zone: self.zone() });
        }

        *shared
            .started_at
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(SystemClock.now());
        shared.active.store(true, Ordering::SeqCst);
        shared.state.send_replace(RunState::Running);
        shared.valve.attach(Driver {
            run: Arc::downgrade(shared),
        });

        tracing::info!(zone = %self.zone(), seconds = shared.duration, "activation started");

        if shared.duration > 0 {
            *countdown = Some(tokio::spawn(run_countdown(Arc::clone(shared))));
        }

        if let Err(source) = shared.valve.open(Duration::from_secs(shared.duration)).await {
            shared.finish(&mut countdown, RunState::Failed).await;
            return Err(ActivationError::OpenFailed {
                zone: self.zone(),
                source,
            });
        }

        if shared.duration == 0 {
            shared.finish(&mut countdown, RunState::Completed).await;
        }
        Ok(())
    }

    /// Stop early. Only the first call on an unfinished run has effect.
    ///
    /// Returns whether this call performed the transition.
    pub async fn stop(&self) -> bool {
        let mut countdown = self.shared.countdown.lock().await;
        self.shared.finish(&mut countdown, RunState::Terminated).await
    }

    /// Wait for completion, up to `timeout` if given.
    ///
    /// Returns the state at the time of return. A run that was never started
    /// returns immediately.
    pub async fn wait(&self, timeout: Option<Duration>) -> RunState {
        let mut rx = self.shared.state.subscribe();
        if *rx.borrow() == RunState::Scheduled {
            return RunState::Scheduled;
        }

        let done = async {
            // The sender lives as long as `self`, so this cannot fail
            let _ = rx.wait_for(|state| state.is_terminal()).await;
        };
        match timeout {
            Some(limit) => {
                let _ = tokio::time::timeout(limit, done).await;
            }
            None => done.await,
        }
        self.state()
    }
}

impl<T: ValveTransport> Shared<T> {
    /// The single terminal transition
    async fn finish(&self, countdown: &mut Option<JoinHandle<()>>, terminal: RunState) -> bool {
        let current = *self.state.borrow();
        if current.is_terminal() {
            return false;
        }

        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = countdown.take() {
            handle.abort();
        }

        // A run that never started never opened anything
        if current != RunState::Scheduled {
            self.valve.close().await;
        }
        self.valve.detach(self);

        self.state.send_replace(terminal);
        tracing::info!(
            zone = %self.valve.id(),
            state = %terminal,
            remaining = self.remaining.load(Ordering::SeqCst),
            "activation finished"
        );
        true
    }
}

async fn run_countdown<T: ValveTransport>(shared: Arc<Shared<T>>) {
    loop {
        tokio::time::sleep(TICK).await;

        let mut countdown = shared.countdown.lock().await;
        if !shared.active.load(Ordering::SeqCst) {
            return;
        }

        let left = shared.remaining.load(Ordering::SeqCst).saturating_sub(1);
        shared.remaining.store(left, Ordering::SeqCst);

        if left == 0 {
            // Detach our own handle so the finish path does not abort this task
            countdown.take();
            shared.finish(&mut countdown, RunState::Completed).await;
            return;
        }
    }
}

#[cfg(test)]
#[path = "activation_tests.rs"]
mod tests;
