// src/remote/invoker.rs

//! Server side of the remote protocol.
//!
//! Every call resolves its URN against the server afresh and is tagged with
//! a new correlation id, so concurrent calls share nothing but the server's
//! own (internally locked) state.

use std::sync::Arc;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, error, info_span, warn};
use uuid::Uuid;

use super::messages::{
    ForceBuildRequest, InvokeArguments, InvokeResult, ProjectList, ProjectRequest, ProjectStatus,
    QueryArguments, QueryResult, RemoteActionDefinition, RemoteResultCode, TaskDescription, VersionInfo,
};
use super::{RemoteEndpoint, Urn};
use crate::engine::{Located, Project, Server};
use crate::errors::RemoteError;
use crate::types::{BoxFuture, IntegrationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    ListProjects,
    GetVersion,
    GetProjectStatus,
    ForceBuild,
    Start,
    Stop,
    GetStatus,
    GetDescription,
}

#[derive(Debug)]
struct ActionSpec {
    kind: ActionKind,
    name: &'static str,
    description: &'static str,
    input_schema: Option<&'static str>,
    input_required: bool,
    output_schema: Option<&'static str>,
}

const SERVER_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        kind: ActionKind::ListProjects,
        name: "ListProjects",
        description: "List the projects configured on this server.",
        input_schema: None,
        input_required: false,
        output_schema: Some("ProjectList"),
    },
    ActionSpec {
        kind: ActionKind::GetVersion,
        name: "GetVersion",
        description: "Report the server name and software version.",
        input_schema: None,
        input_required: false,
        output_schema: Some("VersionInfo"),
    },
    ActionSpec {
        kind: ActionKind::GetProjectStatus,
        name: "GetProjectStatus",
        description: "Report the state and last integration of the named project.",
        input_schema: Some("ProjectRequest"),
        input_required: true,
        output_schema: Some("ProjectStatus"),
    },
];

const PROJECT_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        kind: ActionKind::ForceBuild,
        name: "ForceBuild",
        description: "Queue an integration regardless of the configured trigger.",
        input_schema: Some("ForceBuildRequest"),
        input_required: false,
        output_schema: None,
    },
    ActionSpec {
        kind: ActionKind::Start,
        name: "Start",
        description: "Start the project's scheduling loop.",
        input_schema: None,
        input_required: false,
        output_schema: None,
    },
    ActionSpec {
        kind: ActionKind::Stop,
        name: "Stop",
        description: "Stop the project's scheduling loop after the current integration.",
        input_schema: None,
        input_required: false,
        output_schema: None,
    },
    ActionSpec {
        kind: ActionKind::GetStatus,
        name: "GetStatus",
        description: "Report the project's state and last integration.",
        input_schema: None,
        input_required: false,
        output_schema: Some("ProjectStatus"),
    },
];

const ITEM_ACTIONS: &[ActionSpec] = &[ActionSpec {
    kind: ActionKind::GetDescription,
    name: "GetDescription",
    description: "Describe the task, source control block or trigger.",
    input_schema: None,
    input_required: false,
    output_schema: Some("TaskDescription"),
}];

fn actions_for(located: &Located<'_>) -> &'static [ActionSpec] {
    match located {
        Located::Server => SERVER_ACTIONS,
        Located::Project(_) => PROJECT_ACTIONS,
        Located::Task(..) | Located::SourceControl(..) | Located::Trigger(..) => ITEM_ACTIONS,
    }
}

enum Outcome {
    Done(Option<String>),
    Rejected(RemoteResultCode),
}

/// Resolves incoming calls to this server's entities and runs their actions.
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    server: Arc<Server>,
}

impl ActionInvoker {
    pub fn new(server: Arc<Server>) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    pub fn handle_invoke(&self, urn: &str, arguments: &InvokeArguments) -> InvokeResult {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "remote_invoke",
            correlation_id = %correlation_id,
            urn = %urn,
            action = %arguments.action
        );

        let (code, data) = span.in_scope(|| match self.invoke_inner(urn, arguments) {
            Outcome::Done(data) => {
                debug!("action completed");
                (RemoteResultCode::Success, data)
            }
            Outcome::Rejected(code) => {
                warn!(code = %code, "action rejected");
                (code, None)
            }
        });

        InvokeResult {
            result_code: code,
            correlation_id: Some(correlation_id),
            data,
        }
    }

    fn invoke_inner(&self, urn: &str, arguments: &InvokeArguments) -> Outcome {
        let Some(located) = self.resolve(urn) else {
            return Outcome::Rejected(RemoteResultCode::UnknownUrn);
        };

        let action = arguments.action.trim();
        if action.is_empty() {
            return Outcome::Rejected(RemoteResultCode::MissingArguments);
        }
        let Some(spec) = actions_for(&located)
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(action))
        else {
            return Outcome::Rejected(RemoteResultCode::UnknownAction);
        };

        let data = arguments.data.as_deref().filter(|d| !d.trim().is_empty());
        if spec.input_required && data.is_none() {
            return Outcome::Rejected(RemoteResultCode::MissingArguments);
        }

        let result = match (spec.kind, located) {
            (ActionKind::ListProjects, _) => to_json(&ProjectList {
                projects: self.server.project_names(),
            }),
            (ActionKind::GetVersion, _) => to_json(&VersionInfo {
                server: self.server.name().to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            (ActionKind::GetProjectStatus, _) => {
                let request = match data.map(serde_json::from_str::<ProjectRequest>) {
                    Some(Ok(request)) => request,
                    Some(Err(err)) => {
                        debug!(error = %err, "project status data did not parse");
                        return Outcome::Rejected(RemoteResultCode::InvalidInput);
                    }
                    None => return Outcome::Rejected(RemoteResultCode::MissingArguments),
                };
                match self.server.project(&request.project) {
                    Some(project) => to_json(&project_status(project)),
                    None => return Outcome::Rejected(RemoteResultCode::InvalidInput),
                }
            }
            (ActionKind::ForceBuild, Located::Project(project)) => {
                let request = match data.map(serde_json::from_str::<ForceBuildRequest>) {
                    None => ForceBuildRequest::default(),
                    Some(Ok(request)) => request,
                    Some(Err(err)) => {
                        debug!(error = %err, "force build data did not parse");
                        return Outcome::Rejected(RemoteResultCode::InvalidInput);
                    }
                };
                project.force_build(request.source.unwrap_or_else(|| "remote".to_string()));
                Ok(None)
            }
            (ActionKind::Start, Located::Project(project)) => self
                .server
                .start_project(project.name())
                .map(|_| None)
                .map_err(Into::into),
            (ActionKind::Stop, Located::Project(project)) => self
                .server
                .stop_project(project.name())
                .map(|_| None)
                .map_err(Into::into),
            (ActionKind::GetStatus, Located::Project(project)) => to_json(&project_status(project)),
            (ActionKind::GetDescription, Located::Task(project, task)) => to_json(&TaskDescription {
                name: task.display_name().to_string(),
                kind: task.kind().to_string(),
                project: project.name().to_string(),
            }),
            (ActionKind::GetDescription, Located::SourceControl(project, block)) => {
                to_json(&TaskDescription {
                    name: block.name.clone(),
                    kind: "source_control".to_string(),
                    project: project.name().to_string(),
                })
            }
            (ActionKind::GetDescription, Located::Trigger(project, trigger)) => {
                to_json(&TaskDescription {
                    name: trigger.name().to_string(),
                    kind: trigger.kind().to_string(),
                    project: project.name().to_string(),
                })
            }
            (kind, _) => Err(anyhow::anyhow!("action {kind:?} is not available here")),
        };

        match result {
            Ok(data) => Outcome::Done(data),
            Err(err) => {
                error!(error = %format!("{err:#}"), "action failed");
                Outcome::Rejected(RemoteResultCode::FatalError)
            }
        }
    }

    pub fn handle_query(&self, urn: &str, arguments: &QueryArguments) -> QueryResult {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!("remote_query", correlation_id = %correlation_id, urn = %urn);

        let outcome = span.in_scope(|| {
            let Some(located) = self.resolve(urn) else {
                warn!("unknown urn");
                return Err(RemoteResultCode::UnknownUrn);
            };

            let filter = match arguments.filter_pattern.as_deref().filter(|p| !p.is_empty()) {
                None => None,
                Some(pattern) => match Regex::new(pattern) {
                    Ok(regex) => Some(regex),
                    Err(err) => {
                        warn!(pattern = %pattern, error = %err, "invalid filter pattern");
                        return Err(RemoteResultCode::InvalidInput);
                    }
                },
            };

            let scope = arguments.data_scope;
            let actions = actions_for(&located)
                .iter()
                .filter(|a| filter.as_ref().is_none_or(|r| r.is_match(a.name)))
                .map(|a| RemoteActionDefinition {
                    name: a.name.to_string(),
                    description: a.description.to_string(),
                    input_schema: a
                        .input_schema
                        .filter(|_| scope.includes_input())
                        .map(str::to_string),
                    output_schema: a
                        .output_schema
                        .filter(|_| scope.includes_output())
                        .map(str::to_string),
                })
                .collect::<Vec<_>>();
            debug!(count = actions.len(), "query answered");
            Ok(actions)
        });

        match outcome {
            Ok(actions) => QueryResult {
                result_code: RemoteResultCode::Success,
                correlation_id: Some(correlation_id),
                actions,
            },
            Err(code) => QueryResult {
                correlation_id: Some(correlation_id),
                ..QueryResult::with_code(code)
            },
        }
    }

    fn resolve(&self, urn: &str) -> Option<Located<'_>> {
        let parsed: Urn = match urn.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(error = %err, "unparseable urn");
                return None;
            }
        };
        self.server.locate(&parsed)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Option<String>> {
    Ok(Some(serde_json::to_string(value)?))
}

fn project_status(project: &Project) -> ProjectStatus {
    let last = project.last_result();
    ProjectStatus {
        name: project.name().to_string(),
        state: project.state().to_string(),
        last_status: last
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(IntegrationStatus::Unknown)
            .to_string(),
        last_label: last.map(|r| r.label).filter(|l| !l.is_empty()),
        next_build_time: project
            .next_build_time()
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string()),
        force_pending: project.force_pending(),
    }
}

impl RemoteEndpoint for ActionInvoker {
    fn ping(&self) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }

    fn invoke<'a>(
        &'a self,
        urn: &'a str,
        arguments: InvokeArguments,
    ) -> BoxFuture<'a, Result<InvokeResult, RemoteError>> {
        Box::pin(async move { Ok(self.handle_invoke(urn, &arguments)) })
    }

    fn query<'a>(
        &'a self,
        urn: &'a str,
        arguments: QueryArguments,
    ) -> BoxFuture<'a, Result<QueryResult, RemoteError>> {
        Box::pin(async move { Ok(self.handle_query(urn, &arguments)) })
    }
}
