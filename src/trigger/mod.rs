// src/trigger/mod.rs

//! Trigger engine: decides whether an integration should start.
//!
//! A [`Trigger`] is polled by the project's scheduling loop. Each poll
//! (`check`) either yields an [`IntegrationRequest`] or nothing. After an
//! integration completes the loop calls `reset`, which moves the trigger's
//! `next_time` to the next eligible moment.
//!
//! Lifecycle: `initialise` once when the project starts, `check`/`reset`
//! while running, `clean_up` at shutdown.

pub mod filter;
pub mod force;
pub mod interval;
pub mod multiple;
pub mod roll_up;
pub mod schedule;

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::{BuildCondition, IntegrationRequest};

pub use filter::FilterTrigger;
pub use force::{ForceFlag, ForceTrigger};
pub use interval::IntervalTrigger;
pub use multiple::{CombinationMode, MultipleTrigger};
pub use roll_up::RollUpTrigger;
pub use schedule::ScheduleTrigger;

/// All trigger policies, dispatched by `match`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    Interval(IntervalTrigger),
    Schedule(ScheduleTrigger),
    RollUp(RollUpTrigger),
    Multiple(MultipleTrigger),
    Filter(FilterTrigger),
    /// Wired up by the project for remote force-build requests; never
    /// read from configuration.
    #[serde(skip_deserializing)]
    Force(ForceTrigger),
}

impl Trigger {
    pub fn name(&self) -> &str {
        match self {
            Trigger::Interval(t) => t.name(),
            Trigger::Schedule(t) => t.name(),
            Trigger::RollUp(t) => t.name(),
            Trigger::Multiple(t) => t.name(),
            Trigger::Filter(t) => t.name(),
            Trigger::Force(t) => t.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Trigger::Interval(_) => "interval",
            Trigger::Schedule(_) => "schedule",
            Trigger::RollUp(_) => "roll_up",
            Trigger::Multiple(_) => "multiple",
            Trigger::Filter(_) => "filter",
            Trigger::Force(_) => "force",
        }
    }

    /// Triggers wrapped or combined by this one.
    pub fn children(&self) -> Vec<&Trigger> {
        match self {
            Trigger::RollUp(t) => vec![t.inner()],
            Trigger::Filter(t) => vec![t.inner()],
            Trigger::Multiple(t) => t.triggers().iter().collect(),
            Trigger::Interval(_) | Trigger::Schedule(_) | Trigger::Force(_) => Vec::new(),
        }
    }

    /// Depth-first search by name (case-insensitive), this trigger included.
    pub fn find(&self, name: &str) -> Option<&Trigger> {
        if self.name().eq_ignore_ascii_case(name) {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(name))
    }

    pub fn initialise(&mut self, clock: &dyn Clock) {
        match self {
            Trigger::Interval(t) => t.initialise(clock),
            Trigger::Schedule(t) => t.initialise(clock),
            Trigger::RollUp(t) => t.initialise(clock),
            Trigger::Multiple(t) => t.initialise(clock),
            Trigger::Filter(t) => t.initialise(clock),
            Trigger::Force(_) => {}
        }
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        match self {
            Trigger::Interval(t) => t.check(clock),
            Trigger::Schedule(t) => t.check(clock),
            Trigger::RollUp(t) => t.check(clock),
            Trigger::Multiple(t) => t.check(clock),
            Trigger::Filter(t) => t.check(clock),
            Trigger::Force(t) => t.check(clock),
        }
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        match self {
            Trigger::Interval(t) => t.reset(clock),
            Trigger::Schedule(t) => t.reset(clock),
            Trigger::RollUp(t) => t.reset(clock),
            Trigger::Multiple(t) => t.reset(clock),
            Trigger::Filter(t) => t.reset(clock),
            Trigger::Force(_) => {}
        }
    }

    pub fn clean_up(&mut self) {
        match self {
            Trigger::RollUp(t) => t.clean_up(),
            Trigger::Multiple(t) => t.clean_up(),
            Trigger::Filter(t) => t.clean_up(),
            Trigger::Force(t) => t.clean_up(),
            Trigger::Interval(_) | Trigger::Schedule(_) => {}
        }
    }

    /// When the trigger next becomes eligible to fire, if it has such a notion.
    pub fn next_time(&self) -> Option<NaiveDateTime> {
        match self {
            Trigger::Interval(t) => t.next_time(),
            Trigger::Schedule(t) => t.next_time(),
            Trigger::RollUp(t) => t.next_time(),
            Trigger::Multiple(t) => t.next_time(),
            Trigger::Filter(t) => t.next_time(),
            Trigger::Force(_) => None,
        }
    }

    /// Append configuration problems to `log`; `scope` names the owner.
    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        match self {
            Trigger::Interval(t) => t.validate(scope, log),
            Trigger::Schedule(t) => t.validate(scope, log),
            Trigger::RollUp(t) => t.validate(scope, log),
            Trigger::Multiple(t) => t.validate(scope, log),
            Trigger::Filter(t) => t.validate(scope, log),
            Trigger::Force(_) => {}
        }
    }
}

impl From<IntervalTrigger> for Trigger {
    fn from(t: IntervalTrigger) -> Self {
        Trigger::Interval(t)
    }
}

impl From<ScheduleTrigger> for Trigger {
    fn from(t: ScheduleTrigger) -> Self {
        Trigger::Schedule(t)
    }
}

impl From<RollUpTrigger> for Trigger {
    fn from(t: RollUpTrigger) -> Self {
        Trigger::RollUp(t)
    }
}

impl From<MultipleTrigger> for Trigger {
    fn from(t: MultipleTrigger) -> Self {
        Trigger::Multiple(t)
    }
}

impl From<FilterTrigger> for Trigger {
    fn from(t: FilterTrigger) -> Self {
        Trigger::Filter(t)
    }
}

impl From<ForceTrigger> for Trigger {
    fn from(t: ForceTrigger) -> Self {
        Trigger::Force(t)
    }
}

pub(crate) fn warn_if_silenced(
    scope: &str,
    name: &str,
    condition: BuildCondition,
    log: &mut ValidationLog,
) {
    if condition == BuildCondition::NoBuild {
        log.warning(format!(
            "{scope}: trigger '{name}' has build_condition no_build and will never fire"
        ));
    }
}

/// `now + period`, saturating instead of overflowing.
pub(crate) fn add_period(now: NaiveDateTime, period: Duration) -> NaiveDateTime {
    chrono::Duration::from_std(period)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(NaiveDateTime::MAX)
}
