// src/state/integration.rs

//! Per-project store for the last integration result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::StateError;
use crate::fs::FileSystem;
use crate::types::IntegrationStatus;

/// Snapshot of the last integration of a project.
///
/// Only `project_name` is required when reading; every other field falls
/// back to a default so older files stay readable as fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationResult {
    pub project_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub status: IntegrationStatus,
    #[serde(default)]
    pub last_integration_status: IntegrationStatus,
    #[serde(default)]
    pub last_successful_label: Option<String>,
    #[serde(default)]
    pub start_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub end_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub artifact_directory: Option<PathBuf>,
    /// Name of the trigger that requested the integration.
    #[serde(default)]
    pub trigger: Option<String>,
}

impl IntegrationResult {
    /// An empty result for a project that has never integrated.
    pub fn initial(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            label: String::new(),
            status: IntegrationStatus::Unknown,
            last_integration_status: IntegrationStatus::Unknown,
            last_successful_label: None,
            start_time: None,
            end_time: None,
            working_directory: None,
            artifact_directory: None,
            trigger: None,
        }
    }

    /// Label for the integration following this one (`1`, `2`, ...).
    ///
    /// A label that is not a number restarts the sequence at `1`.
    pub fn next_label(&self) -> String {
        let next = self.label.trim().parse::<u64>().map(|n| n + 1).unwrap_or(1);
        next.to_string()
    }
}

/// Derive the state file name for a project: every run of alphanumeric
/// characters is title-cased and concatenated, then `.state` is appended
/// (`"my project"` becomes `MyProject.state`).
pub fn state_file_name(project_name: &str) -> String {
    let mut name = String::new();
    for word in project_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.extend(first.to_uppercase());
            name.push_str(chars.as_str());
        }
    }
    if name.is_empty() {
        name.push_str("Unnamed");
    }
    name.push_str(".state");
    name
}

/// Loads and saves [`IntegrationResult`]s as JSON documents in one directory.
#[derive(Debug, Clone)]
pub struct IntegrationStateStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl IntegrationStateStore {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, project_name: &str) -> PathBuf {
        self.dir.join(state_file_name(project_name))
    }

    pub fn has_previous_state(&self, project_name: &str) -> bool {
        self.fs.exists(&self.path_for(project_name))
    }

    pub fn save(&self, result: &IntegrationResult) -> Result<(), StateError> {
        let path = self.path_for(&result.project_name);
        let json = serde_json::to_string_pretty(result).map_err(|e| StateError::Persist {
            path: path.clone(),
            source: e.into(),
        })?;

        self.fs
            .ensure_folder_exists(&self.dir)
            .and_then(|_| self.fs.atomic_save(&path, json.as_bytes()))
            .map_err(|source| StateError::Persist {
                path: path.clone(),
                source,
            })?;

        debug!(project = %result.project_name, path = ?path, "saved integration state");
        Ok(())
    }

    pub fn load(&self, project_name: &str) -> Result<IntegrationResult, StateError> {
        let path = self.path_for(project_name);
        if !self.fs.exists(&path) {
            return Err(StateError::NotFound {
                project: project_name.to_string(),
            });
        }

        let contents = self.fs.load(&path).map_err(|source| StateError::Io {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| {
            warn!(project = %project_name, path = ?path, error = %source, "state file is corrupt");
            StateError::Parse { path, source }
        })
    }

    /// Load the last result, treating a missing or corrupt file as "no history".
    pub fn load_or_initial(&self, project_name: &str) -> Result<IntegrationResult, StateError> {
        match self.load(project_name) {
            Ok(result) => Ok(result),
            Err(err) if err.is_recoverable() => {
                debug!(project = %project_name, reason = %err, "starting without prior state");
                Ok(IntegrationResult::initial(project_name))
            }
            Err(err) => Err(err),
        }
    }
}
