// src/trigger/roll_up.rs

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::trace;

use super::{Trigger, add_period};
use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::IntegrationRequest;

/// Limits how often an inner trigger may fire.
///
/// The inner trigger is only polled once the roll-up window has elapsed.
/// `reset` advances the window but leaves the inner trigger's own timing
/// alone; the wrapper gates frequency only.
///
/// ```toml
/// [project.trigger]
/// type = "roll_up"
/// period = "10m"
///
/// [project.trigger.inner]
/// type = "interval"
/// period = "30s"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RollUpTrigger {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize")]
    pub period: Duration,

    pub inner: Box<Trigger>,

    #[serde(skip)]
    next_time: Option<NaiveDateTime>,
}

impl RollUpTrigger {
    pub const DEFAULT_NAME: &'static str = "RollUpTrigger";

    pub fn new(period: Duration, inner: impl Into<Trigger>) -> Self {
        Self {
            name: None,
            period,
            inner: Box::new(inner.into()),
            next_time: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }

    pub fn inner(&self) -> &Trigger {
        &self.inner
    }

    /// The later of the roll-up gate and the inner trigger's own next time.
    pub fn next_time(&self) -> Option<NaiveDateTime> {
        match (self.next_time, self.inner.next_time()) {
            (Some(gate), Some(inner)) => Some(gate.max(inner)),
            (gate, inner) => gate.or(inner),
        }
    }

    pub fn initialise(&mut self, clock: &dyn Clock) {
        self.inner.initialise(clock);
        self.next_time = Some(clock.now());
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let now = clock.now();
        if let Some(gate) = self.next_time {
            if now < gate {
                trace!(trigger = %self.name(), %gate, "rolled up, suppressing");
                return None;
            }
        }
        self.inner.check(clock)
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        self.next_time = Some(add_period(clock.now(), self.period));
    }

    pub fn clean_up(&mut self) {
        self.inner.clean_up();
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.period.is_zero() {
            log.error(format!(
                "{scope}: trigger '{}' requires a period greater than zero",
                self.name()
            ));
        }
        self.inner.validate(scope, log);
    }
}
