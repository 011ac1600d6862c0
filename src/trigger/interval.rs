// src/trigger/interval.rs

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use super::{add_period, warn_if_silenced};
use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::{BuildCondition, IntegrationRequest};

/// Fires once `period` has elapsed since the last reset.
///
/// ```toml
/// [project.trigger]
/// type = "interval"
/// period = "5m"
/// initial_period = "10s"   # optional, first fire after start
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalTrigger {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize")]
    pub period: Duration,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize_option")]
    pub initial_period: Option<Duration>,

    /// Attached to every request; `no_build` silences the trigger.
    #[serde(default)]
    pub build_condition: BuildCondition,

    #[serde(skip)]
    next_time: Option<NaiveDateTime>,
}

impl IntervalTrigger {
    pub const DEFAULT_NAME: &'static str = "IntervalTrigger";

    pub fn new(period: Duration) -> Self {
        Self {
            name: None,
            period,
            initial_period: None,
            build_condition: BuildCondition::default(),
            next_time: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_initial_period(mut self, initial: Duration) -> Self {
        self.initial_period = Some(initial);
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

    pub fn initialise(&mut self, clock: &dyn Clock) {
        let first = self.initial_period.unwrap_or(self.period);
        self.next_time = Some(add_period(clock.now(), first));
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let now = clock.now();
        match self.next_time {
            Some(next) if now >= next => {
                debug!(trigger = %self.name(), %next, "interval elapsed");
                if self.build_condition == BuildCondition::NoBuild {
                    return None;
                }
                Some(IntegrationRequest::new(self.name(), now).with_condition(self.build_condition))
            }
            Some(_) => None,
            None => {
                // Polled before initialise: start counting from now.
                self.initialise(clock);
                None
            }
        }
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        self.next_time = Some(add_period(clock.now(), self.period));
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.period.is_zero() {
            log.error(format!(
                "{scope}: trigger '{}' requires a period greater than zero",
                self.name()
            ));
        }
        warn_if_silenced(scope, self.name(), self.build_condition, log);
    }
}
