// src/task/force_build.rs

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::{ExecutionContext, TaskEnvironment};
use crate::config::validate::ValidationLog;
use crate::errors::RemoteError;
use crate::remote::{ForceBuildRequest, InvokeArguments, InvokeResult, RemoteEndpoint, Urn};
use crate::types::IntegrationStatus;

pub const FORCE_BUILD_ACTION: &str = "ForceBuild";

/// Asks another project, on this server or a remote one, to build.
///
/// ```toml
/// [[project.tasks]]
/// type = "force_build"
/// project = "downstream"                    # or "server:project", or a URN
/// server_address = "tcp://build-2:21235"   # only for other servers
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ForceBuildTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "project")]
    pub project_name: String,

    #[serde(default)]
    pub server_address: Option<String>,
}

impl ForceBuildTask {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, server_address: impl Into<String>) -> Self {
        self.server_address = Some(server_address.into());
        self
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) {
        let urn = match Urn::resolve_target(&self.project_name, env.server_name) {
            Ok(urn) => urn,
            Err(err) => {
                context.add_log(format!("Unable to force build: {err}"));
                context.set_status(IntegrationStatus::Failure);
                return;
            }
        };
        let target = urn.project.clone().unwrap_or_default();
        let urn_text = urn.to_string();

        let request = ForceBuildRequest {
            source: Some(env.project_name.to_string()),
        };
        let mut arguments = InvokeArguments::new(FORCE_BUILD_ACTION);
        match serde_json::to_string(&request) {
            Ok(data) => arguments = arguments.with_data(data),
            Err(err) => warn!(error = %err, "unable to encode force build request"),
        }

        let (outcome, address) = if urn.is_local_to(env.server_name) {
            (env.local.invoke(&urn_text, arguments).await, None)
        } else {
            let Some(address) = self.server_address.as_deref() else {
                context.add_log(format!(
                    "Unable to force build '{target}': no address configured for server '{}'",
                    urn.server
                ));
                context.set_status(IntegrationStatus::Failure);
                return;
            };
            let outcome = match env.connector.connect(address) {
                Ok(endpoint) => invoke_remote(endpoint, &urn_text, arguments).await,
                Err(err) => Err(err),
            };
            (outcome, Some(address))
        };

        let location = address.map(|a| format!(" on {a}")).unwrap_or_default();
        match outcome {
            Ok(result) if result.is_success() => {
                info!(project = %env.project_name, target = %target, urn = %urn_text, "force build sent");
                context.add_log(format!("Force build requested for '{target}'{location}"));
            }
            Ok(result) => {
                warn!(
                    project = %env.project_name,
                    target = %target,
                    code = %result.result_code,
                    correlation_id = ?result.correlation_id,
                    "force build rejected"
                );
                context.add_log(format!(
                    "Force build for '{target}'{location} failed: {}{}",
                    result.result_code,
                    correlation_suffix(&result)
                ));
                context.set_status(IntegrationStatus::Failure);
            }
            Err(err) => {
                warn!(project = %env.project_name, target = %target, error = %err, "force build call failed");
                context.add_log(format!(
                    "Force build for '{target}'{location} failed: {err}"
                ));
                context.set_status(IntegrationStatus::Failure);
            }
        }
    }

    pub fn validate(&self, scope: &str, server_name: &str, log: &mut ValidationLog) {
        if self.project_name.trim().is_empty() {
            log.error(format!("{scope}: force_build task requires a project name"));
            return;
        }
        match Urn::resolve_target(&self.project_name, server_name) {
            Err(err) => log.error(format!("{scope}: force_build task: {err}")),
            Ok(urn) if !urn.is_local_to(server_name) && self.server_address.is_none() => {
                log.error(format!(
                    "{scope}: force_build target '{}' is on server '{}' but no server_address is set",
                    self.project_name, urn.server
                ));
            }
            Ok(_) => {}
        }
    }
}

async fn invoke_remote(
    endpoint: Arc<dyn RemoteEndpoint>,
    urn: &str,
    arguments: InvokeArguments,
) -> Result<InvokeResult, RemoteError> {
    endpoint.invoke(urn, arguments).await
}

fn correlation_suffix(result: &InvokeResult) -> String {
    result
        .correlation_id
        .as_deref()
        .map(|id| format!(" (correlation id {id})"))
        .unwrap_or_default()
}
