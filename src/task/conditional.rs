// src/task/conditional.rs

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

use super::sequence::SequenceCursor;
use super::{Children, ExecutionContext, Task};
use crate::config::validate::ValidationLog;
use crate::types::{BuildCondition, IntegrationStatus};

/// A test evaluated against the run so far.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskCondition {
    /// The run's status so far. Nothing reported yet counts as `Success`.
    Status { equals: IntegrationStatus },

    /// A path relative to the working directory exists.
    FileExists { path: PathBuf },

    /// The request that started the run carried this condition.
    #[serde(rename = "build_condition")]
    Requested { value: BuildCondition },

    And { conditions: Vec<TaskCondition> },

    Or { conditions: Vec<TaskCondition> },
}

impl TaskCondition {
    pub fn eval(&self, context: &ExecutionContext) -> bool {
        match self {
            TaskCondition::Status { equals } => context.final_status() == *equals,
            TaskCondition::FileExists { path } => {
                let resolved = context.resolve_working_path(path);
                context.file_system().exists(&resolved)
            }
            TaskCondition::Requested { value } => context.build_condition() == *value,
            TaskCondition::And { conditions } => conditions.iter().all(|c| c.eval(context)),
            TaskCondition::Or { conditions } => conditions.iter().any(|c| c.eval(context)),
        }
    }

    fn validate(&self, scope: &str, log: &mut ValidationLog) {
        match self {
            TaskCondition::And { conditions } | TaskCondition::Or { conditions } => {
                if conditions.is_empty() {
                    log.error(format!("{scope}: and/or condition has no inner conditions"));
                }
                for inner in conditions {
                    inner.validate(scope, log);
                }
            }
            _ => {}
        }
    }
}

/// Runs `tasks` when every condition holds and `else_tasks` otherwise.
///
/// Conditions are checked when the task is reached, so they see the status
/// and files left by the tasks before it. Children of the chosen branch all
/// run, failed or not.
#[derive(Debug, Clone, Deserialize)]
pub struct ConditionalTask {
    #[serde(default)]
    pub name: Option<String>,

    pub conditions: Vec<TaskCondition>,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub else_tasks: Vec<Task>,
}

impl ConditionalTask {
    pub fn new(conditions: Vec<TaskCondition>, tasks: Vec<Task>) -> Self {
        Self {
            name: None,
            conditions,
            tasks,
            else_tasks: Vec::new(),
        }
    }

    pub fn otherwise(mut self, else_tasks: Vec<Task>) -> Self {
        self.else_tasks = else_tasks;
        self
    }

    pub fn run<'a>(&'a self, context: &mut ExecutionContext) -> Children<'a> {
        let passed = self.conditions.iter().all(|c| c.eval(context));
        debug!(project = %context.project_name(), passed, "evaluated task conditions");

        let branch = if passed {
            context.add_log("Conditions passed - running tasks");
            &self.tasks
        } else {
            context.add_log("Conditions did not pass - running else tasks");
            &self.else_tasks
        };

        if branch.is_empty() {
            return None;
        }
        Some(Box::new(SequenceCursor::new(branch, false)))
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.conditions.is_empty() {
            log.error(format!(
                "{scope}: conditional task '{}' has no conditions",
                self.name.as_deref().unwrap_or("conditional")
            ));
        }
        for condition in &self.conditions {
            condition.validate(scope, log);
        }
    }
}
