// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::ConfigFile;
use crate::errors::{CcnetError, Result};

/// Findings collected while validating a configuration.
///
/// Every component appends to the same log so a single run reports all
/// problems at once instead of stopping at the first.
#[derive(Debug, Default, Clone)]
pub struct ValidationLog {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// `Err(Validation)` listing every error, or `Ok` with the warnings
    /// still available to the caller.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(CcnetError::Validation(self.errors.join("\n")))
        }
    }
}

/// Run semantic validation against a loaded configuration.
///
/// This checks:
/// - the server has a name
/// - project names are present and unique
/// - every trigger and task is internally consistent
pub fn validate_config(cfg: &ConfigFile, log: &mut ValidationLog) {
    let server_name = cfg.server.name.trim();
    if server_name.is_empty() {
        log.error("[server].name must not be empty");
    }
    if server_name.contains(':') {
        log.error(format!("[server].name '{server_name}' must not contain ':'"));
    }
    if cfg.server.poll_interval.is_zero() {
        log.error("[server].poll_interval must be greater than zero");
    }

    if cfg.projects.is_empty() {
        log.warning("no [[project]] sections configured");
    }

    let mut seen = HashSet::new();
    for (index, project) in cfg.projects.iter().enumerate() {
        let name = project.name.trim();
        let scope = if name.is_empty() {
            log.error(format!("project #{} has no name", index + 1));
            format!("project #{}", index + 1)
        } else {
            format!("project '{name}'")
        };
        if !name.is_empty() && !seen.insert(name.to_lowercase()) {
            log.error(format!("{scope}: duplicate project name"));
        }
        if name.contains(':') {
            log.error(format!("{scope}: name must not contain ':'"));
        }

        let mut block_names = HashSet::new();
        for block in &project.source_control {
            if block.name.trim().is_empty() {
                log.error(format!("{scope}: source control block without a name"));
            } else if !block_names.insert(block.name.as_str()) {
                log.error(format!(
                    "{scope}: duplicate source control block '{}'",
                    block.name
                ));
            }
            if block.repository.trim().is_empty() {
                log.error(format!(
                    "{scope}: source control block '{}' has no repository",
                    block.name
                ));
            }
        }

        if let Some(trigger) = &project.trigger {
            trigger.validate(&scope, log);
        }

        if project.tasks.is_empty() {
            log.warning(format!("{scope}: no tasks configured"));
        }
        for task in &project.tasks {
            task.validate(&scope, server_name, &project.source_control, log);
        }
    }
}
