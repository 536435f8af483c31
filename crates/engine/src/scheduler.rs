// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger scheduler
//!
//! Holds recurring and one-off triggers keyed by [`TriggerKey`]. A
//! background loop calls [`Scheduler::dispatch_due`] every poll interval;
//! each fired trigger resolves a [`Program`] and runs it in its own task,
//! so a long program never delays dispatch of the next one.

use crate::error::EngineError;
use crate::program::{Pacing, Program, ProgramLookup, MIN_POLL};
use crate::registry::ZoneRegistry;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use spk_adapters::ValveTransport;
use spk_core::{Clock, DayOption, ProgramDef, ProgramId, Step, TriggerError, TriggerKey};
use spk_storage::{StoreError, TriggerStore};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One-off runs fire this many seconds after they are registered
const ADHOC_LEAD_SECS: i64 = 1;

/// Scheduler collaborators
pub struct SchedulerDeps<T: ValveTransport, C: Clock> {
    pub registry: Arc<ZoneRegistry<T>>,
    pub programs: Arc<dyn ProgramLookup>,
    pub store: Arc<dyn TriggerStore>,
    pub clock: C,
}

/// Scheduler timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How often the dispatch loop looks for due triggers
    pub poll_interval: Duration,
    pub pacing: Pacing,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            pacing: Pacing::default(),
        }
    }
}

/// A registered trigger, for listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerInfo {
    pub key: TriggerKey,
    pub name: String,
    pub next_fire: DateTime<Local>,
    pub recurring: bool,
}

#[derive(Debug, Clone)]
enum Plan {
    Recurring(DayOption),
    Once {
        name: String,
        program_id: Option<ProgramId>,
        steps: Option<Vec<Step>>,
    },
}

impl Plan {
    fn name(&self) -> &str {
        match self {
            Plan::Recurring(rule) => &rule.name,
            Plan::Once { name, .. } => name,
        }
    }
}

struct Entry {
    plan: Plan,
    next_fire: DateTime<Local>,
}

struct Inner<T: ValveTransport, C: Clock> {
    registry: Arc<ZoneRegistry<T>>,
    programs: Arc<dyn ProgramLookup>,
    store: Arc<dyn TriggerStore>,
    clock: C,
    config: SchedulerConfig,
    rules: Mutex<BTreeMap<TriggerKey, Entry>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle to the trigger table and its dispatch loop
pub struct Scheduler<T: ValveTransport, C: Clock> {
    inner: Arc<Inner<T, C>>,
}

impl<T: ValveTransport, C: Clock> Clone for Scheduler<T, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ValveTransport, C: Clock> Scheduler<T, C> {
    pub fn new(deps: SchedulerDeps<T, C>, mut config: SchedulerConfig) -> Self {
        if config.poll_interval < MIN_POLL || config.pacing.poll_interval < MIN_POLL {
            tracing::warn!(
                poll_ms = config.poll_interval.as_millis() as u64,
                "poll interval below 1ms, raised"
            );
            config.poll_interval = config.poll_interval.max(MIN_POLL);
            config.pacing.poll_interval = config.pacing.poll_interval.max(MIN_POLL);
        }
        Self {
            inner: Arc::new(Inner {
                registry: deps.registry,
                programs: deps.programs,
                store: deps.store,
                clock: deps.clock,
                config,
                rules: Mutex::new(BTreeMap::new()),
                tasks: Mutex::new(Vec::new()),
                dispatcher: Mutex::new(None),
            }),
        }
    }

    fn rules(&self) -> MutexGuard<'_, BTreeMap<TriggerKey, Entry>> {
        self.inner.rules.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Load persisted recurring rules.
    ///
    /// A stored fire time still in the future is kept. One that has passed
    /// is logged as missed and replaced by the rule's next occurrence.
    pub fn restore(&self) -> usize {
        let now = self.inner.clock.now();
        let stored = self.inner.store.list();
        let count = stored.len();

        let mut rules = self.rules();
        for (key, trigger) in stored {
            let next_fire = match trigger.next_fire.map(|t| t.with_timezone(&Local)) {
                Some(at) if at > now => at,
                Some(at) => {
                    tracing::info!(key = %key, missed = %at, "missed fire not replayed");
                    trigger.rule.next_fire(now)
                }
                None => trigger.rule.next_fire(now),
            };
            rules.insert(
                key,
                Entry {
                    plan: Plan::Recurring(trigger.rule),
                    next_fire,
                },
            );
        }

        tracing::info!(count, "restored recurring triggers");
        count
    }

    /// Install or replace a recurring rule and persist it.
    ///
    /// The rule is active in memory even when persisting fails; the store
    /// error is still returned.
    pub fn register_recurring(&self, rule: DayOption) -> Result<TriggerKey, EngineError> {
        let key = rule.key()?;
        let next_fire = rule.next_fire(self.inner.clock.now());

        let replaced = self
            .rules()
            .insert(
                key.clone(),
                Entry {
                    plan: Plan::Recurring(rule.clone()),
                    next_fire,
                },
            )
            .is_some();
        tracing::info!(
            key = %key,
            name = %rule.name,
            next_fire = %next_fire,
            replaced,
            "scheduled recurring trigger"
        );

        self.inner
            .store
            .save(&key, &rule, Some(next_fire.with_timezone(&Utc)))
            .map_err(|e| {
                tracing::warn!(key = %key, error = %e, "failed to persist trigger");
                e
            })?;
        Ok(key)
    }

    /// Schedule a one-off run about a second from now.
    ///
    /// Inline `steps` win over `program_id`; with neither there is nothing to
    /// run. One-off runs are never persisted.
    pub fn register_adhoc(
        &self,
        steps: Option<Vec<Step>>,
        program_id: Option<ProgramId>,
        name: impl Into<String>,
    ) -> Result<TriggerKey, EngineError> {
        let name = name.into();
        let label = match (&steps, &program_id) {
            (_, Some(id)) => id.to_string(),
            (Some(_), None) => "adhoc".to_string(),
            (None, None) => return Err(TriggerError::MissingProgram(name).into()),
        };

        let now = self.inner.clock.now();
        let base = TriggerKey::adhoc(&label, now);
        let next_fire = now + chrono::Duration::seconds(ADHOC_LEAD_SECS);

        let mut rules = self.rules();
        let mut key = base.clone();
        let mut suffix = 1;
        while rules.contains_key(&key) {
            key = TriggerKey::new(format!("{}-{}", base, suffix));
            suffix += 1;
        }
        rules.insert(
            key.clone(),
            Entry {
                plan: Plan::Once {
                    name: name.clone(),
                    program_id,
                    steps,
                },
                next_fire,
            },
        );

        tracing::info!(key = %key, name = %name, "scheduled one-off run");
        Ok(key)
    }

    /// Remove a trigger. Removing something that does not exist is an error.
    pub fn remove(&self, key: &TriggerKey) -> Result<(), EngineError> {
        let in_memory = self.rules().remove(key).is_some();
        if key.is_adhoc() {
            if !in_memory {
                return Err(EngineError::TriggerNotFound(key.clone()));
            }
            tracing::info!(key = %key, "removed one-off trigger");
            return Ok(());
        }

        match self.inner.store.remove(key) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) if in_memory => {}
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(key = %key, "remove of unknown trigger");
                return Err(EngineError::TriggerNotFound(key.clone()));
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to remove persisted trigger");
                return Err(e.into());
            }
        }
        tracing::info!(key = %key, "removed trigger");
        Ok(())
    }

    /// Remove the recurring trigger matching `rule`
    pub fn remove_rule(&self, rule: &DayOption) -> Result<(), EngineError> {
        self.remove(&rule.key()?)
    }

    /// Make a trigger due now without touching its definition
    pub fn trigger_now(&self, key: &TriggerKey) -> Result<(), EngineError> {
        let now = self.inner.clock.now();
        let recurring = {
            let mut rules = self.rules();
            let entry = rules
                .get_mut(key)
                .ok_or_else(|| EngineError::TriggerNotFound(key.clone()))?;
            entry.next_fire = now;
            matches!(entry.plan, Plan::Recurring(_))
        };
        tracing::info!(key = %key, "trigger brought forward to now");

        if recurring {
            self.inner
                .store
                .reschedule(key, now.with_timezone(&Utc))
                .map_err(|e| {
                    tracing::warn!(key = %key, error = %e, "failed to persist reschedule");
                    e
                })?;
        }
        Ok(())
    }

    /// Registered triggers ordered by next fire time
    pub fn list(&self) -> Vec<TriggerInfo> {
        let mut out: Vec<_> = self
            .rules()
            .iter()
            .map(|(key, entry)| TriggerInfo {
                key: key.clone(),
                name: entry.plan.name().to_string(),
                next_fire: entry.next_fire,
                recurring: matches!(entry.plan, Plan::Recurring(_)),
            })
            .collect();
        out.sort_by(|a, b| a.next_fire.cmp(&b.next_fire).then(a.key.cmp(&b.key)));
        out
    }

    /// Fire every trigger whose time has come.
    ///
    /// Recurring triggers move to their next occurrence (persisted); one-off
    /// triggers are dropped. Returns the fired keys.
    pub fn dispatch_due(&self) -> Vec<TriggerKey> {
        let now = self.inner.clock.now();
        let mut fired = Vec::new();
        let mut moved = Vec::new();

        {
            let mut rules = self.rules();
            let due: Vec<TriggerKey> = rules
                .iter()
                .filter(|(_, entry)| entry.next_fire <= now)
                .map(|(key, _)| key.clone())
                .collect();

            for key in due {
                let Some(entry) = rules.get_mut(&key) else {
                    continue;
                };
                let plan = entry.plan.clone();
                match &plan {
                    Plan::Recurring(rule) => {
                        entry.next_fire = rule.next_fire(now);
                        moved.push((key.clone(), entry.next_fire));
                    }
                    Plan::Once { .. } => {
                        rules.remove(&key);
                    }
                }
                fired.push((key, plan));
            }
        }

        for (key, next_fire) in moved {
            if let Err(e) = self.inner.store.reschedule(&key, next_fire.with_timezone(&Utc)) {
                tracing::warn!(key = %key, error = %e, "failed to persist next fire");
            }
        }

        fired
            .into_iter()
            .map(|(key, plan)| {
                tracing::info!(key = %key, name = %plan.name(), "trigger fired");
                self.spawn_program(key.clone(), plan);
                key
            })
            .collect()
    }

    fn spawn_program(&self, key: TriggerKey, plan: Plan) {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let mut program = match inner.resolve(plan) {
                Ok(program) => program,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "could not resolve program");
                    return;
                }
            };
            program.run_sequentially(inner.config.pacing).await;
            program.cleanup().await;
        });

        let mut tasks = self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
    }

    /// Number of program runs still in progress
    pub fn running(&self) -> usize {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|task| !task.is_finished());
        tasks.len()
    }

    /// Start the background dispatch loop, replacing any previous one
    pub fn spawn_dispatcher(&self) {
        let scheduler = self.clone();
        let period = self.inner.config.poll_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                scheduler.dispatch_due();
            }
        });

        let previous = self
            .inner
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        tracing::info!(poll_ms = period.as_millis() as u64, "dispatch loop started");
    }

    /// Stop dispatching and cancel in-flight programs. Cancelled programs
    /// stop their activations through their drop guard.
    pub async fn shutdown(&self) {
        let dispatcher = self
            .inner
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(dispatcher) = dispatcher {
            dispatcher.abort();
            let _ = dispatcher.await;
        }

        let tasks: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();
        let cancelled = tasks.iter().filter(|t| !t.is_finished()).count();
        for task in tasks {
            task.abort();
            let _ = task.await;
        }
        tracing::info!(cancelled, "scheduler stopped");
    }
}

impl<T: ValveTransport, C: Clock> Inner<T, C> {
    fn resolve(&self, plan: Plan) -> Result<Program<T>, EngineError> {
        let (name, program_id, steps) = match plan {
            Plan::Recurring(rule) => (rule.name, rule.program_id, rule.steps),
            Plan::Once {
                name,
                program_id,
                steps,
            } => (name, program_id, steps),
        };

        let def = match (steps, program_id) {
            (Some(steps), id) => {
                ProgramDef::new(id.unwrap_or_else(|| ProgramId::from("adhoc")), name, steps)
            }
            (None, Some(id)) => self
                .programs
                .find(&id)
                .ok_or(EngineError::ProgramNotFound(id))?,
            (None, None) => return Err(TriggerError::MissingProgram(name).into()),
        };
        Ok(Program::new(def, Arc::clone(&self.registry)))
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
