// src/remote/messages.rs

//! Request and response shapes of the remote protocol.
//!
//! These are serialized as JSON on every transport.

use serde::{Deserialize, Serialize};

use crate::types::DataScope;

/// Outcome of an `invoke` or `query` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteResultCode {
    Success,
    FatalError,
    UnknownUrn,
    UnknownAction,
    InvalidInput,
    MissingArguments,
}

impl std::fmt::Display for RemoteResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InvokeArguments {
    #[serde(default)]
    pub action: String,
    /// JSON text matching the action's input schema, if it takes any.
    #[serde(default)]
    pub data: Option<String>,
}

impl InvokeArguments {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResult {
    pub result_code: RemoteResultCode,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl InvokeResult {
    pub fn with_code(result_code: RemoteResultCode) -> Self {
        Self {
            result_code,
            correlation_id: None,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code == RemoteResultCode::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QueryArguments {
    /// Regular expression matched against action names.
    #[serde(default)]
    pub filter_pattern: Option<String>,
    #[serde(default)]
    pub data_scope: DataScope,
}

/// Description of one action available on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteActionDefinition {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub input_schema: Option<String>,
    #[serde(default)]
    pub output_schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub result_code: RemoteResultCode,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<RemoteActionDefinition>,
}

impl QueryResult {
    pub fn with_code(result_code: RemoteResultCode) -> Self {
        Self {
            result_code,
            correlation_id: None,
            actions: Vec::new(),
        }
    }
}

/// Input of the `ForceBuild` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ForceBuildRequest {
    /// Who asked for the build (a project name, a user, a tool).
    #[serde(default)]
    pub source: Option<String>,
}

/// Input of the server's `GetProjectStatus` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub project: String,
}

/// Output of a project's `GetStatus` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatus {
    pub name: String,
    pub state: String,
    pub last_status: String,
    #[serde(default)]
    pub last_label: Option<String>,
    #[serde(default)]
    pub next_build_time: Option<String>,
    pub force_pending: bool,
}

/// Output of the server's `ListProjects` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<String>,
}

/// Output of the server's `GetVersion` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub server: String,
    pub version: String,
}

/// Output of `GetDescription` on a project item: a task, a source control
/// block or a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescription {
    pub name: String,
    pub kind: String,
    pub project: String,
}

/// One frame on the socket binding, client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WireRequest {
    Ping,
    Invoke {
        urn: String,
        arguments: InvokeArguments,
    },
    Query {
        urn: String,
        arguments: QueryArguments,
    },
}

/// One frame on the socket binding, server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WireResponse {
    Pong { alive: bool },
    Invoke(InvokeResult),
    Query(QueryResult),
    Error { message: String },
}

/// Body of `POST /invoke` on the HTTP binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeBody {
    pub urn: String,
    #[serde(default)]
    pub arguments: InvokeArguments,
}

/// Body of `POST /query` on the HTTP binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryBody {
    pub urn: String,
    #[serde(default)]
    pub arguments: QueryArguments,
}
