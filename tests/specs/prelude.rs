//! Shared helpers for specs

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use spk_adapters::{FakeTransport, TransportCall, ValveCommand};
use spk_core::{Failsafe, FakeClock, ProgramDef, Step, Zone};
use spk_engine::{
    Controller, Pacing, Scheduler, SchedulerConfig, SchedulerDeps, StaticPrograms, ZoneRegistry,
};
use spk_storage::{MemoryTriggerStore, TriggerStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub use assert_cmd::Command;
pub use predicates::prelude::*;

/// Local time on a fixed June 2026 day
pub fn june(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 6, day, hour, minute, second)
        .single()
        .unwrap()
}

/// Engine wired to a fake transport: three zones on channels 31..=33, a
/// "morning" program over zones 3 then 2, and a clock at 05:59:30
pub struct Garden {
    pub controller: Controller<FakeTransport, FakeClock>,
    pub transport: FakeTransport,
    pub clock: FakeClock,
}

impl Garden {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryTriggerStore::new()))
    }

    pub fn with_store(store: Arc<dyn TriggerStore>) -> Self {
        let transport = FakeTransport::new();
        let clock = FakeClock::at(june(10, 5, 59, 30));
        let registry = Arc::new(ZoneRegistry::new(
            vec![
                Zone::new(1, "Front lawn", 31),
                Zone::new(2, "Side garden", 32),
                Zone::new(3, "Back garden", 33),
            ],
            transport.clone(),
            Failsafe::new(Duration::from_secs(600)),
        ));
        let programs = StaticPrograms::new(vec![ProgramDef::new(
            "morning",
            "Morning Program",
            vec![Step::new(3, 10), Step::new(2, 10)],
        )]);
        let scheduler = Scheduler::new(
            SchedulerDeps {
                registry: Arc::clone(&registry),
                programs: Arc::new(programs),
                store,
                clock: clock.clone(),
            },
            SchedulerConfig {
                poll_interval: Duration::from_secs(1),
                pacing: Pacing {
                    step_delay: Duration::from_secs(2),
                    poll_interval: Duration::from_secs(1),
                },
            },
        );
        Self {
            controller: Controller::new(registry, scheduler, Duration::from_secs(60)),
            transport,
            clock,
        }
    }

    pub fn scheduler(&self) -> &Scheduler<FakeTransport, FakeClock> {
        self.controller.scheduler()
    }

    /// Commands sent so far, as (channel, command) pairs
    pub fn commands(&self) -> Vec<(u32, ValveCommand)> {
        self.transport
            .calls()
            .into_iter()
            .map(|TransportCall { channel, command }| (channel, command))
            .collect()
    }
}

/// Wait on paused tokio time
pub async fn elapse(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// A temporary state directory with a dummy-mode config file
pub struct DummyDaemon {
    dir: TempDir,
}

impl DummyDaemon {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        let config = format!(
            r#"
[engine]
dummy = true
state_dir = "{}"

[[zones]]
id = 1
name = "Front lawn"
channel = 31

[programs.morning]
steps = [[1, 10]]

[[schedules]]
name = "Everyday Morning"
at = "05:30"
program = "morning"
"#,
            state.display()
        );
        std::fs::write(dir.path().join("sprinkler.toml"), config).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("sprinkler.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("state").join("spkd.log")
    }

    pub fn spkd(&self) -> Command {
        let mut cmd = Command::cargo_bin("spkd").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env_remove("SPK_CONFIG");
        cmd
    }
}
