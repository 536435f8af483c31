// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the run-control engine

use spk_adapters::TransportError;
use spk_core::{ProgramId, TriggerError, TriggerKey, ZoneId};
use spk_storage::StoreError;
use thiserror::Error;

/// Errors from starting an activation
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("activation for zone {zone} was already started")]
    AlreadyStarted { zone: ZoneId },
    #[error("zone {zone} failed to open: {source}")]
    OpenFailed {
        zone: ZoneId,
        #[source]
        source: TransportError,
    },
}

/// Errors surfaced by the scheduler and controller
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("zone not found: {0}")]
    ZoneNotFound(ZoneId),
    #[error("program not found: {0}")]
    ProgramNotFound(ProgramId),
    #[error("trigger not found: {0}")]
    TriggerNotFound(TriggerKey),
    #[error("invalid trigger: {0}")]
    Trigger(#[from] TriggerError),
    #[error("trigger store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Activation(#[from] ActivationError),
}
