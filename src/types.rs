// src/types.rs

//! Small value types shared by triggers, tasks, the state store and the
//! scheduling loop.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Boxed future returned by the collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of an integration run (or of the run so far).
///
/// Ordered by severity: a context only ever moves to a more severe status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum IntegrationStatus {
    #[default]
    Unknown,
    Success,
    Failure,
    Exception,
}

impl IntegrationStatus {
    pub fn is_failed(self) -> bool {
        matches!(self, IntegrationStatus::Failure | IntegrationStatus::Exception)
    }
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrationStatus::Unknown => "Unknown",
            IntegrationStatus::Success => "Success",
            IntegrationStatus::Failure => "Failure",
            IntegrationStatus::Exception => "Exception",
        };
        f.write_str(s)
    }
}

/// How insistent an integration request is.
///
/// Triggers attach one to each request. `NoBuild` configured on a trigger
/// keeps it from ever firing; tasks can branch on the rest through a
/// conditional task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuildCondition {
    NoBuild,
    #[default]
    IfModificationExists,
    ForceBuild,
}

impl fmt::Display for BuildCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildCondition::NoBuild => "NoBuild",
            BuildCondition::IfModificationExists => "IfModificationExists",
            BuildCondition::ForceBuild => "ForceBuild",
        };
        f.write_str(s)
    }
}

/// Produced by a trigger's `check()`; consumed once by the scheduling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationRequest {
    pub source_trigger: String,
    pub requested_at: NaiveDateTime,
    #[serde(default)]
    pub build_condition: BuildCondition,
}

impl IntegrationRequest {
    pub fn new(source_trigger: impl Into<String>, requested_at: NaiveDateTime) -> Self {
        Self {
            source_trigger: source_trigger.into(),
            requested_at,
            build_condition: BuildCondition::default(),
        }
    }

    pub fn with_condition(mut self, condition: BuildCondition) -> Self {
        self.build_condition = condition;
        self
    }
}

/// Lifecycle of a project's scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectState::Stopped => "Stopped",
            ProjectState::Starting => "Starting",
            ProjectState::Running => "Running",
            ProjectState::Stopping => "Stopping",
        };
        f.write_str(s)
    }
}

/// Which data definitions a `query` should describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DataScope {
    #[default]
    Both,
    InputOnly,
    OutputOnly,
    None,
}

impl DataScope {
    pub fn includes_input(self) -> bool {
        matches!(self, DataScope::Both | DataScope::InputOnly)
    }

    pub fn includes_output(self) -> bool {
        matches!(self, DataScope::Both | DataScope::OutputOnly)
    }
}

impl FromStr for DataScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "both" => Ok(DataScope::Both),
            "inputonly" => Ok(DataScope::InputOnly),
            "outputonly" => Ok(DataScope::OutputOnly),
            "none" => Ok(DataScope::None),
            other => Err(format!(
                "invalid data scope: {other} (expected both, input-only, output-only or none)"
            )),
        }
    }
}
