// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration sections

use crate::program::{ProgramId, Step};
use crate::trigger::{DayFilter, StartTime};
use crate::zone::ZoneId;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// `[engine]`: run-control tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Failsafe ceiling for any single activation
    #[serde(with = "humantime_serde")]
    pub failsafe_max: Duration,
    /// Progress poll and dispatch tick interval
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Pause between program steps
    #[serde(with = "humantime_serde")]
    pub step_delay: Duration,
    /// Manual activation length when none is requested
    #[serde(with = "humantime_serde")]
    pub default_run: Duration,
    /// Log valve commands instead of sending them
    pub dummy: bool,
    /// Where the trigger log and daemon log live
    pub state_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            failsafe_max: Duration::from_secs(1800),
            poll_interval: Duration::from_secs(3),
            step_delay: Duration::from_secs(2),
            default_run: Duration::from_secs(60),
            dummy: false,
            state_dir: None,
        }
    }
}

/// `[mqtt]`: broker connection and topic layout
#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_qos")]
    pub qos: u8,
    /// Command topic; `{channel}` is replaced by the zone channel
    #[serde(default = "default_set_topic")]
    pub set_topic: String,
    /// Confirmation subscription, with `+` in the channel position
    #[serde(default = "default_state_topic")]
    pub state_topic: String,
}

fn default_port() -> u16 {
    1883
}

fn default_qos() -> u8 {
    1
}

fn default_set_topic() -> String {
    "sprinkler/{channel}/set".to_string()
}

fn default_state_topic() -> String {
    "sprinkler/+/get".to_string()
}

/// `[[zones]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub name: String,
    pub channel: u32,
}

/// `[programs.<id>]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramConfig {
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

/// `[[schedules]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    pub at: StartTime,
    pub program: Option<ProgramId>,
    pub steps: Option<Vec<Step>>,
    pub days: Option<DayFilter>,
}
