// src/trigger/schedule.rs

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;
use tracing::debug;

use super::warn_if_silenced;
use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::{BuildCondition, IntegrationRequest};

/// Fires once a day at a wall-clock time, optionally only on some weekdays.
///
/// ```toml
/// [project.trigger]
/// type = "schedule"
/// time = "23:30"
/// weekdays = ["Mon", "Wed", "Fri"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleTrigger {
    #[serde(default)]
    pub name: Option<String>,

    /// `HH:MM` or `HH:MM:SS`.
    #[serde(default)]
    pub time: Option<String>,

    /// Empty means every day.
    #[serde(default)]
    pub weekdays: Vec<Weekday>,

    /// Attached to every request; `no_build` silences the trigger.
    #[serde(default)]
    pub build_condition: BuildCondition,

    #[serde(skip)]
    next_time: Option<NaiveDateTime>,
}

impl ScheduleTrigger {
    pub const DEFAULT_NAME: &'static str = "ScheduleTrigger";

    pub fn new(time: impl Into<String>) -> Self {
        Self {
            name: None,
            time: Some(time.into()),
            weekdays: Vec::new(),
            build_condition: BuildCondition::default(),
            next_time: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn on_weekdays(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = days.into_iter().collect();
        self
    }

    pub fn with_condition(mut self, condition: BuildCondition) -> Self {
        self.build_condition = condition;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }

    /// `None` for a `no_build` trigger, which never becomes due.
    pub fn next_time(&self) -> Option<NaiveDateTime> {
        self.next_time.filter(|_| self.build_condition != BuildCondition::NoBuild)
    }

    pub fn time_of_day(&self) -> Option<NaiveTime> {
        self.time.as_deref().and_then(parse_time_of_day)
    }

    pub fn initialise(&mut self, clock: &dyn Clock) {
        self.next_time = self.next_occurrence(clock.now());
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let now = clock.now();
        if self.next_time.is_none() {
            self.next_time = self.next_occurrence(now);
            return None;
        }
        match self.next_time {
            Some(next) if now >= next => {
                debug!(trigger = %self.name(), %next, "scheduled time reached");
                if self.build_condition == BuildCondition::NoBuild {
                    return None;
                }
                Some(IntegrationRequest::new(self.name(), now).with_condition(self.build_condition))
            }
            _ => None,
        }
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        self.next_time = self.next_occurrence(clock.now());
    }

    /// First configured time-of-day strictly after `now` on an allowed weekday.
    pub fn next_occurrence(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let time = self.time_of_day()?;
        let mut candidate = now.date().and_time(time);
        if candidate <= now {
            candidate += Duration::days(1);
        }
        for _ in 0..7 {
            if self.allows(candidate.weekday()) {
                return Some(candidate);
            }
            candidate += Duration::days(1);
        }
        None
    }

    fn allows(&self, day: Weekday) -> bool {
        self.weekdays.is_empty() || self.weekdays.contains(&day)
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        match self.time.as_deref() {
            None => log.error(format!(
                "{scope}: trigger '{}' requires a time of day",
                self.name()
            )),
            Some(raw) if parse_time_of_day(raw).is_none() => log.error(format!(
                "{scope}: trigger '{}' has invalid time '{raw}' (expected HH:MM or HH:MM:SS)",
                self.name()
            )),
            Some(_) => {}
        }
        warn_if_silenced(scope, self.name(), self.build_condition, log);
    }
}

pub(crate) fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}
