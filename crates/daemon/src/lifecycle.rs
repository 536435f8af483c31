// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fs2::FileExt;
use spk_adapters::{
    ChannelReport, MqttTransport, NoOpTransport, TracedTransport, TransportError, ValveCommand,
    ValveTransport,
};
use spk_core::{Config, ConfigError, SystemClock};
use spk_engine::{
    Controller, Pacing, Scheduler, SchedulerConfig, SchedulerDeps, StaticPrograms, ZoneRegistry,
};
use spk_storage::{StoreError, WalTriggerStore};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Hardware link chosen at startup
#[derive(Clone)]
pub enum DaemonTransport {
    Mqtt(MqttTransport),
    Dummy(NoOpTransport),
}

#[async_trait]
impl ValveTransport for DaemonTransport {
    async fn set_channel(&self, channel: u32, command: ValveCommand) -> Result<(), TransportError> {
        match self {
            DaemonTransport::Mqtt(t) => t.set_channel(channel, command).await,
            DaemonTransport::Dummy(t) => t.set_channel(channel, command).await,
        }
    }
}

/// Controller with concrete transport and clock (wrapped with tracing)
pub type DaemonController = Controller<TracedTransport<DaemonTransport>, SystemClock>;

/// Files owned by a running daemon
#[derive(Debug, Clone)]
pub struct Paths {
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the trigger log
    pub wal_path: PathBuf,
}

impl Paths {
    /// Paths under `engine.state_dir`, or the XDG state directory when unset
    pub fn for_config(config: &Config) -> Result<Self, LifecycleError> {
        let dir = match &config.engine.state_dir {
            Some(dir) => dir.clone(),
            None => state_dir()?,
        };
        Ok(Self::in_dir(dir))
    }

    pub fn in_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            lock_path: state_dir.join("spkd.pid"),
            log_path: state_dir.join("spkd.log"),
            wal_path: state_dir.join("wal").join("triggers.wal"),
            state_dir,
        }
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub paths: Paths,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub controller: Arc<DaemonController>,
    /// Drains hardware confirmations into the controller log
    confirmations: Option<JoinHandle<()>>,
    /// When daemon started
    pub start_time: Instant,
}

impl DaemonState {
    /// Stop every run, close every valve, release the lock
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Stop dispatch and close valves before anything else
        self.controller.shutdown().await;

        // 2. Stop listening for confirmations
        if let Some(task) = self.confirmations.take() {
            task.abort();
        }

        // 3. Remove PID file
        if self.paths.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 4. Lock file is released automatically when self.lock_file is dropped

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Trigger store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config, paths: &Paths) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config, paths).await {
        Ok(state) => Ok(state),
        // The lock file belongs to the daemon that holds it
        Err(e @ LifecycleError::LockFailed(_)) => Err(e),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(paths);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config, paths: &Paths) -> Result<DaemonState, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&paths.state_dir)?;

    // 2. Acquire lock file FIRST - two daemons must never drive the same valves
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&paths.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    lock_file.set_len(0)?;
    let mut lock_file = lock_file;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Open the trigger log
    let store = WalTriggerStore::open(&paths.wal_path)?;

    // 4. Pick the transport
    let (transport, reports) = if config.engine.dummy {
        info!("dummy mode: valve commands are logged only");
        (DaemonTransport::Dummy(NoOpTransport::new()), None)
    } else {
        let mqtt = config.mqtt.as_ref().ok_or(ConfigError::MissingMqtt)?;
        let (transport, reports) = MqttTransport::start(mqtt);
        (DaemonTransport::Mqtt(transport), Some(reports))
    };
    let transport = TracedTransport::new(transport);

    // 5. Build the engine
    let registry = Arc::new(ZoneRegistry::new(
        config.zones(),
        transport,
        config.failsafe(),
    ));
    let scheduler = Scheduler::new(
        SchedulerDeps {
            registry: Arc::clone(&registry),
            programs: Arc::new(StaticPrograms::new(config.programs())),
            store: Arc::new(store),
            clock: SystemClock,
        },
        SchedulerConfig {
            poll_interval: config.engine.poll_interval,
            pacing: Pacing {
                step_delay: config.engine.step_delay,
                poll_interval: config.engine.poll_interval,
            },
        },
    );

    // 6. Restore persisted triggers, then add the configured ones
    let restored = scheduler.restore();
    for rule in config.day_options() {
        let name = rule.name.clone();
        if let Err(e) = scheduler.register_recurring(rule) {
            warn!(schedule = %name, error = %e, "failed to register schedule");
        }
    }
    scheduler.spawn_dispatcher();

    let controller = Arc::new(Controller::new(
        registry,
        scheduler,
        config.engine.default_run,
    ));
    let confirmations = reports.map(|reports| spawn_confirmations(Arc::clone(&controller), reports));

    info!(
        zones = config.zones.len(),
        restored,
        triggers = controller.triggers().len(),
        "Daemon started"
    );

    Ok(DaemonState {
        paths: paths.clone(),
        lock_file,
        controller,
        confirmations,
        start_time: Instant::now(),
    })
}

fn spawn_confirmations(
    controller: Arc<DaemonController>,
    mut reports: mpsc::Receiver<ChannelReport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            controller.record_confirmation(&report);
        }
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(paths: &Paths) {
    if paths.lock_path.exists() {
        let _ = std::fs::remove_file(&paths.lock_path);
    }
}

/// Get the state directory for spkd
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("spk"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(Path::new(&home).join(".local/state/spk"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
