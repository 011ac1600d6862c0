// src/trigger/multiple.rs

use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::Trigger;
use crate::clock::Clock;
use crate::config::validate::ValidationLog;
use crate::types::IntegrationRequest;

/// How a [`MultipleTrigger`] combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CombinationMode {
    #[default]
    Or,
    And,
}

impl FromStr for CombinationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "or" => Ok(CombinationMode::Or),
            "and" => Ok(CombinationMode::And),
            other => Err(format!("invalid operator: {other} (expected \"or\" or \"and\")")),
        }
    }
}

/// Combines child triggers with `Or` (any fired) or `And` (all fired).
///
/// Every child is polled on every `check`, in order, whatever the mode, so
/// children with side effects in `check` (such as a one-shot force flag)
/// always observe the poll.
#[derive(Debug, Clone, Deserialize)]
pub struct MultipleTrigger {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub operator: CombinationMode,

    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

impl MultipleTrigger {
    pub const DEFAULT_NAME: &'static str = "MultipleTrigger";

    pub fn new(operator: CombinationMode, triggers: Vec<Trigger>) -> Self {
        Self {
            name: None,
            operator,
            triggers,
        }
    }

    pub fn any(triggers: Vec<Trigger>) -> Self {
        Self::new(CombinationMode::Or, triggers)
    }

    pub fn all(triggers: Vec<Trigger>) -> Self {
        Self::new(CombinationMode::And, triggers)
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(Self::DEFAULT_NAME)
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Earliest next time among the children that have one.
    pub fn next_time(&self) -> Option<NaiveDateTime> {
        self.triggers.iter().filter_map(Trigger::next_time).min()
    }

    pub fn initialise(&mut self, clock: &dyn Clock) {
        for trigger in &mut self.triggers {
            trigger.initialise(clock);
        }
    }

    pub fn check(&mut self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        let results: Vec<Option<IntegrationRequest>> =
            self.triggers.iter_mut().map(|t| t.check(clock)).collect();

        match self.operator {
            CombinationMode::Or => results.into_iter().flatten().next(),
            CombinationMode::And => {
                if results.is_empty() || results.iter().any(Option::is_none) {
                    None
                } else {
                    results.into_iter().flatten().next()
                }
            }
        }
    }

    pub fn reset(&mut self, clock: &dyn Clock) {
        for trigger in &mut self.triggers {
            trigger.reset(clock);
        }
    }

    pub fn clean_up(&mut self) {
        for trigger in &mut self.triggers {
            trigger.clean_up();
        }
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.triggers.is_empty() {
            log.warning(format!(
                "{scope}: trigger '{}' has no child triggers and will never fire",
                self.name()
            ));
        }
        for trigger in &self.triggers {
            trigger.validate(scope, log);
        }
    }
}
