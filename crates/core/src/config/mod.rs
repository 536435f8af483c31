// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded from a TOML file with `[engine]`, `[mqtt]`, `[[zones]]`,
//! `[programs.<id>]` and `[[schedules]]` sections.

mod settings;

pub use settings::{EngineConfig, MqttConfig, ProgramConfig, ScheduleConfig, ZoneConfig};

use crate::program::{ProgramDef, ProgramId};
use crate::trigger::DayOption;
use crate::zone::{Failsafe, Zone, ZoneId};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("duplicate zone id: {0}")]
    DuplicateZone(ZoneId),
    #[error("duplicate channel {channel} on zone {zone}")]
    DuplicateChannel { zone: ZoneId, channel: u32 },
    #[error("zero-length step for zone {zone} in {context}")]
    EmptyStep { context: String, zone: ZoneId },
    #[error("schedule '{0}' needs a program or steps")]
    MissingProgram(String),
    #[error("schedule '{schedule}' references unknown program '{program}'")]
    UnknownProgram { schedule: String, program: ProgramId },
    #[error("failsafe_max must be greater than zero")]
    ZeroFailsafe,
    #[error("poll_interval must be greater than zero")]
    ZeroPollInterval,
    #[error("[mqtt] section is required unless engine.dummy is set")]
    MissingMqtt,
}

/// Parsed configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub mqtt: Option<MqttConfig>,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    #[serde(default)]
    pub programs: BTreeMap<String, ProgramConfig>,
    #[serde(default)]
    pub schedules: Vec<ScheduleConfig>,
}

impl Config {
    /// Parse and validate TOML content
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.failsafe_max.is_zero() {
            return Err(ConfigError::ZeroFailsafe);
        }
        if self.engine.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if !self.engine.dummy && self.mqtt.is_none() {
            return Err(ConfigError::MissingMqtt);
        }

        let mut ids = HashSet::new();
        let mut channels = HashSet::new();
        for zone in &self.zones {
            if !ids.insert(zone.id) {
                return Err(ConfigError::DuplicateZone(zone.id));
            }
            if !channels.insert(zone.channel) {
                return Err(ConfigError::DuplicateChannel {
                    zone: zone.id,
                    channel: zone.channel,
                });
            }
        }

        for (id, program) in &self.programs {
            if let Some(step) = program.steps.iter().find(|s| s.seconds == 0) {
                return Err(ConfigError::EmptyStep {
                    context: format!("program {}", id),
                    zone: step.zone,
                });
            }
            for step in program.steps.iter().filter(|s| !ids.contains(&s.zone)) {
                tracing::warn!(program = %id, zone = %step.zone, "step references unknown zone, it will be skipped");
            }
        }

        for schedule in &self.schedules {
            match (&schedule.program, &schedule.steps) {
                (None, None) => return Err(ConfigError::MissingProgram(schedule.name.clone())),
                (Some(program), None) if !self.programs.contains_key(program.as_str()) => {
                    return Err(ConfigError::UnknownProgram {
                        schedule: schedule.name.clone(),
                        program: program.clone(),
                    });
                }
                (_, Some(steps)) => {
                    if let Some(step) = steps.iter().find(|s| s.seconds == 0) {
                        return Err(ConfigError::EmptyStep {
                            context: format!("schedule {}", schedule.name),
                            zone: step.zone,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    pub fn failsafe(&self) -> Failsafe {
        Failsafe::new(self.engine.failsafe_max)
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.zones
            .iter()
            .map(|z| Zone::new(z.id, z.name.clone(), z.channel))
            .collect()
    }

    /// Program definitions keyed by id; a missing name falls back to the id
    pub fn programs(&self) -> Vec<ProgramDef> {
        self.programs
            .iter()
            .map(|(id, p)| {
                let name = p.name.clone().unwrap_or_else(|| id.clone());
                ProgramDef::new(id.as_str(), name, p.steps.clone())
            })
            .collect()
    }

    /// Recurring triggers declared in `[[schedules]]`
    pub fn day_options(&self) -> Vec<DayOption> {
        self.schedules
            .iter()
            .map(|s| DayOption {
                name: s.name.clone(),
                start: s.at,
                program_id: s.program.clone(),
                steps: s.steps.clone(),
                days: s.days,
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
