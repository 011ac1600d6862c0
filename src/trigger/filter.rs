// src/trigger/filter.rs

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;
use tracing::trace;

use super::Trigger;
use super::schedule::parse_time_of_day;
use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::IntegrationRequest;

/// Keeps an inner trigger quiet during a daily time window.
///
/// Outside the window the inner trigger is polled as usual. Inside it the
/// inner trigger is not polled at all. A window whose end lies before its
/// start wraps past midnight. `weekdays` narrows the window to those days;
/// empty means every day.
///
/// ```toml
/// [project.trigger]
/// type = "filter"
/// start_time = "23:00"
/// end_time = "07:00"
///
/// [project.trigger.inner]
/// type = "interval"
/// period = "1m"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FilterTrigger {
    #[serde(default)]
    pub name: Option<String>,

    /// `HH:MM` or `HH:MM:SS`; defaults to the start of the day.
    #[serde(default)]
    pub start_time: Option<String>,

    /// `HH:MM` or `HH:MM:SS`; defaults to the end of the day.
    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default)]
    pub weekdays: Vec<Weekday>,

    pub inner: Box<Trigger>,
}

impl FilterTrigger {
    pub const DEFAULT_NAME: &'static str = "FilterTrigger";

    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        inner: impl Into<Trigger>,
    ) -> Self {
        Self {
            name: None,
            start_time: Some(start_time.into()),
            end_time: Some(end_time.into()),
            weekdays: Vec::new(),
            inner: Box::new(inner.into()),
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

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }

    pub fn inner(&self) -> &Trigger {
        &self.inner
    }

    fn window(&self) -> (NaiveTime, NaiveTime) {
        let start = self
            .start_time
            .as_deref()
            .and_then(parse_time_of_day)
            .unwrap_or_default();
        let end = self
            .end_time
            .as_deref()
            .and_then(parse_time_of_day)
            .unwrap_or_else(end_of_day);
        (start, end)
    }

    /// Whether `at` falls inside the suppression window.
    pub fn is_filtered(&self, at: NaiveDateTime) -> bool {
        if !self.weekdays.is_empty() && !self.weekdays.contains(&at.weekday()) {
            return false;
        }
        let (start, end) = self.window();
        let time = at.time();
        if start < end {
            time >= start && time <= end
        } else {
            time > start || time < end
        }
    }

    /// The inner trigger's next time, pushed to the end of the window when
    /// it lands inside one.
    pub fn next_time(&self) -> Option<NaiveDateTime> {
        let next = self.inner.next_time()?;
        if !self.is_filtered(next) {
            return Some(next);
        }
        let (_, end) = self.window();
        let mut released = next.date().and_time(end);
        if released <= next {
            released += Duration::days(1);
        }
        Some(released)
    }

    pub fn initialise(&mut self, clock: &dyn Clock) {
        self.inner.initialise(clock);
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let now = clock.now();
        if self.is_filtered(now) {
            trace!(trigger = %self.name(), %now, "inside filter window");
            return None;
        }
        self.inner.check(clock)
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        self.inner.reset(clock);
    }

    pub fn clean_up(&mut self) {
        self.inner.clean_up();
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        for (field, value) in [("start_time", &self.start_time), ("end_time", &self.end_time)] {
            if let Some(raw) = value.as_deref() {
                if parse_time_of_day(raw).is_none() {
                    log.error(format!(
                        "{scope}: trigger '{}' has invalid {field} '{raw}' (expected HH:MM or HH:MM:SS)",
                        self.name()
                    ));
                }
            }
        }
        self.inner.validate(scope, log);
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default()
}
