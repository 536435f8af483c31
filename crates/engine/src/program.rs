// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Program sequencer: runs per-zone steps one after another

use crate::activation::Activation;
use crate::registry::ZoneRegistry;
use spk_adapters::ValveTransport;
use spk_core::{ProgramDef, ProgramId, RunState, Step, ZoneId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Source of named program definitions
pub trait ProgramLookup: Send + Sync + 'static {
    fn find(&self, id: &ProgramId) -> Option<ProgramDef>;
}

/// Program definitions held in memory, typically loaded from config
#[derive(Debug, Clone, Default)]
pub struct StaticPrograms {
    programs: HashMap<ProgramId, ProgramDef>,
}

impl StaticPrograms {
    pub fn new(defs: impl IntoIterator<Item = ProgramDef>) -> Self {
        Self {
            programs: defs.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    pub fn insert(&mut self, def: ProgramDef) {
        self.programs.insert(def.id.clone(), def);
    }
}

impl ProgramLookup for StaticPrograms {
    fn find(&self, id: &ProgramId) -> Option<ProgramDef> {
        self.programs.get(id).cloned()
    }
}

/// Floor for any poll period; a zero period would spin
pub(crate) const MIN_POLL: Duration = Duration::from_millis(1);

/// Timing for [`Program::run_sequentially`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between consecutive steps
    pub step_delay: Duration,
    /// How often progress is logged while a step runs
    pub poll_interval: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(3),
        }
    }
}

/// How one expanded step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub zone: ZoneId,
    pub state: RunState,
}

/// A program instance built for one fire.
///
/// Dropping a program that was not cleaned up stops its unfinished
/// activations on the current runtime.
pub struct Program<T: ValveTransport> {
    id: ProgramId,
    name: String,
    steps: Vec<Step>,
    registry: Option<Arc<ZoneRegistry<T>>>,
    runs: Vec<Activation<T>>,
    expanded: bool,
    cleaned: bool,
}

impl<T: ValveTransport> Program<T> {
    pub fn new(def: ProgramDef, registry: Arc<ZoneRegistry<T>>) -> Self {
        Self {
            id: def.id,
            name: def.name,
            steps: def.steps,
            registry: Some(registry),
            runs: Vec::new(),
            expanded: false,
            cleaned: false,
        }
    }

    pub fn id(&self) -> &ProgramId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn activations(&self) -> &[Activation<T>] {
        &self.runs
    }

    /// Resolve steps into activations, skipping zones the registry lacks.
    /// Only the first call builds anything.
    pub fn expand(&mut self) -> &[Activation<T>] {
        if self.expanded {
            return &self.runs;
        }
        self.expanded = true;

        let Some(registry) = &self.registry else {
            return &self.runs;
        };
        for step in &self.steps {
            match registry.get(step.zone) {
                Some(valve) => self.runs.push(Activation::new(valve, step.seconds)),
                None => tracing::warn!(
                    program = %self.id,
                    zone = %step.zone,
                    "zone not found, step skipped"
                ),
            }
        }
        &self.runs
    }

    /// Run every activation in order, one at a time.
    ///
    /// A step that fails to start is logged and the program moves on.
    pub async fn run_sequentially(&mut self, pacing: Pacing) -> Vec<StepOutcome> {
        let runs = self.expand().to_vec();
        tracing::info!(program = %self.id, name = %self.name, steps = runs.len(), "program started");

        let poll = pacing.poll_interval.max(MIN_POLL);
        let mut outcomes = Vec::with_capacity(runs.len());
        for (index, run) in runs.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(pacing.step_delay).await;
            }

            if let Err(e) = run.start().await {
                tracing::warn!(program = %self.id, error = %e, "step failed to start, continuing");
                outcomes.push(StepOutcome {
                    zone: run.zone(),
                    state: run.state(),
                });
                continue;
            }

            let state = loop {
                let state = run.wait(Some(poll)).await;
                if state != RunState::Running {
                    break state;
                }
                tracing::debug!(
                    program = %self.id,
                    zone = %run.zone(),
                    remaining = run.remaining(),
                    "step running"
                );
            };
            tracing::info!(program = %self.id, zone = %run.zone(), %state, "step finished");
            outcomes.push(StepOutcome {
                zone: run.zone(),
                state,
            });
        }

        tracing::info!(program = %self.id, "program finished");
        outcomes
    }

    /// Stop every unfinished activation and release the steps and registry.
    /// Safe to call more than once, and before or without a run.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }

        for run in self.runs.clone() {
            if !run.is_finished() {
                run.stop().await;
            }
        }

        self.runs.clear();
        self.steps.clear();
        self.registry = None;
        self.cleaned = true;
        tracing::debug!(program = %self.id, "program cleaned up");
    }
}

impl<T: ValveTransport> Drop for Program<T> {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        let pending: Vec<_> = self
            .runs
            .drain(..)
            .filter(|run| !run.is_finished())
            .collect();
        if pending.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    program = %self.id,
                    pending = pending.len(),
                    "program dropped without cleanup, stopping activations"
                );
                handle.spawn(async move {
                    for run in pending {
                        run.stop().await;
                    }
                });
            }
            Err(_) => tracing::error!(
                program = %self.id,
                pending = pending.len(),
                "program dropped outside a runtime, activations left running"
            ),
        }
    }
}

#[cfg(test)]
#[path = "program_tests.rs"]
mod tests;
