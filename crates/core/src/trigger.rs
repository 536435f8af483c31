// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger definitions and next-fire computation
//!
//! A [`DayOption`] is a recurring rule: a time of day, an optional
//! day-of-week filter, and either a program id or an inline step list.
//! Its [`TriggerKey`] is derived from program + days + time so that
//! re-registering the same logical rule replaces it.

use crate::program::{ProgramId, Step};
use chrono::{DateTime, Datelike, Local, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from building or parsing triggers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    #[error("invalid start time: {0}")]
    InvalidTime(String),
    #[error("invalid day filter: {0}")]
    InvalidDays(String),
    #[error("trigger '{0}' needs a program id or steps")]
    MissingProgram(String),
}

/// Unique key of a registered trigger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerKey(pub String);

impl TriggerKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for a one-off run, derived from the request time
    pub fn adhoc(program: &str, at: DateTime<Local>) -> Self {
        Self(format!("adhoc:{}:{}", program, at.timestamp()))
    }

    pub fn is_adhoc(&self) -> bool {
        self.0.starts_with("adhoc:")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TriggerKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Time of day a recurring trigger fires, local time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StartTime {
    hour: u32,
    minute: u32,
}

impl StartTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, TriggerError> {
        if hour > 23 || minute > 59 {
            return Err(TriggerError::InvalidTime(format!("{}:{}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    fn as_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for StartTime {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| TriggerError::InvalidTime(s.to_string()))?;
        let hour = h
            .parse()
            .map_err(|_| TriggerError::InvalidTime(s.to_string()))?;
        let minute = m
            .parse()
            .map_err(|_| TriggerError::InvalidTime(s.to_string()))?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for StartTime {
    type Error = TriggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<StartTime> for String {
    fn from(t: StartTime) -> Self {
        t.to_string()
    }
}

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Day-of-week filter
///
/// Accepts comma-separated names (`mon`, `Tuesday`), numbers (`0` = Monday)
/// and inclusive ranges (`mon-fri`, `0-4`). Displays in canonical
/// Monday-first order so equivalent filters derive the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayFilter {
    mask: u8,
}

impl DayFilter {
    pub fn from_days(days: &[Weekday]) -> Result<Self, TriggerError> {
        let mask = days
            .iter()
            .fold(0u8, |mask, d| mask | (1 << d.num_days_from_monday()));
        if mask == 0 {
            return Err(TriggerError::InvalidDays("empty".to_string()));
        }
        Ok(Self { mask })
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.mask & (1 << day.num_days_from_monday()) != 0
    }

    pub fn days(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEK.iter().copied().filter(|d| self.contains(*d))
    }
}

fn parse_day(token: &str) -> Result<u32, TriggerError> {
    let token = token.trim();
    if let Ok(n) = token.parse::<u32>() {
        if n < 7 {
            return Ok(n);
        }
        return Err(TriggerError::InvalidDays(token.to_string()));
    }
    token
        .parse::<Weekday>()
        .map(|d| d.num_days_from_monday())
        .map_err(|_| TriggerError::InvalidDays(token.to_string()))
}

impl FromStr for DayFilter {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mask = 0u8;
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                return Err(TriggerError::InvalidDays(s.to_string()));
            }
            match part.split_once('-') {
                Some((from, to)) => {
                    let (from, to) = (parse_day(from)?, parse_day(to)?);
                    if from > to {
                        return Err(TriggerError::InvalidDays(part.to_string()));
                    }
                    for d in from..=to {
                        mask |= 1 << d;
                    }
                }
                None => mask |= 1 << parse_day(part)?,
            }
        }
        Ok(Self { mask })
    }
}

impl fmt::Display for DayFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .days()
            .map(|d| d.to_string().to_lowercase())
            .collect();
        write!(f, "{}", names.join(","))
    }
}

impl TryFrom<String> for DayFilter {
    type Error = TriggerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DayFilter> for String {
    fn from(d: DayFilter) -> Self {
        d.to_string()
    }
}

/// A recurring trigger: run a program at a time of day, optionally only on
/// certain days.
///
/// When `steps` is present they are run as-is (with `program_id` as the run's
/// id if given); otherwise the program is looked up by `program_id` at fire
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOption {
    pub name: String,
    pub start: StartTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<ProgramId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<Step>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<DayFilter>,
}

impl DayOption {
    pub fn new(name: impl Into<String>, start: StartTime) -> Self {
        Self {
            name: name.into(),
            start,
            program_id: None,
            steps: None,
            days: None,
        }
    }

    pub fn program(mut self, id: impl Into<ProgramId>) -> Self {
        self.program_id = Some(id.into());
        self
    }

    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn on(mut self, days: DayFilter) -> Self {
        self.days = Some(days);
        self
    }

    /// The program reference used in the key: the id, or `adhoc` for
    /// inline steps
    pub fn program_label(&self) -> Result<String, TriggerError> {
        match (&self.program_id, &self.steps) {
            (Some(id), _) => Ok(id.to_string()),
            (None, Some(_)) => Ok("adhoc".to_string()),
            (None, None) => Err(TriggerError::MissingProgram(self.name.clone())),
        }
    }

    /// Deterministic key: `program:<pid>:<days|daily>-<HHMM>`
    pub fn key(&self) -> Result<TriggerKey, TriggerError> {
        let pid = self.program_label()?;
        let days = self
            .days
            .map(|d| d.to_string())
            .unwrap_or_else(|| "daily".to_string());
        Ok(TriggerKey(format!(
            "program:{}:{}-{:02}{:02}",
            pid,
            days,
            self.start.hour(),
            self.start.minute()
        )))
    }

    /// First matching naive local time strictly after `after`
    pub fn next_fire_after(&self, after: NaiveDateTime) -> NaiveDateTime {
        let at = self.start.as_naive();
        let start_date = after.date();
        start_date
            .iter_days()
            .take(8)
            .map(|date| date.and_time(at))
            .find(|candidate| {
                *candidate > after && self.days.map_or(true, |d| d.contains(candidate.weekday()))
            })
            .unwrap_or_else(|| start_date.and_time(at) + chrono::Duration::days(7))
    }

    /// Next fire time strictly after `now`, skipping local times that do
    /// not exist (DST gaps)
    pub fn next_fire(&self, now: DateTime<Local>) -> DateTime<Local> {
        let mut after = now.naive_local();
        for _ in 0..8 {
            let candidate = self.next_fire_after(after);
            if let Some(at) = Local.from_local_datetime(&candidate).earliest() {
                if at > now {
                    return at;
                }
            }
            after = candidate;
        }
        now + chrono::Duration::days(1)
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
