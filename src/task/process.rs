// src/task/process.rs

//! Shared handling for tasks that shell out through the process executor.

use tracing::{info, warn};

use super::ExecutionContext;
use crate::exec::{ProcessExecutor, ProcessInfo};
use crate::types::IntegrationStatus;

/// Run `info`, append its output to the build log and fold the outcome into
/// the context status. Never returns an error: a process that cannot be
/// started is a failed task, not a failed pipeline.
///
/// Returns whether the process succeeded.
pub async fn execute_and_record(
    what: &str,
    info: ProcessInfo,
    executor: &dyn ProcessExecutor,
    context: &mut ExecutionContext,
) -> bool {
    let command_line = info.command_line();
    context.add_log(format!("{what}: executing {command_line}"));

    let result = match executor.execute(info).await {
        Ok(result) => result,
        Err(err) => {
            warn!(project = %context.project_name(), task = %what, error = %err, "process failed to run");
            context.add_log(format!("{what}: unable to run '{command_line}': {err}"));
            context.set_status(IntegrationStatus::Failure);
            return false;
        }
    };

    let output = result.output.trim_end();
    if !output.is_empty() {
        context.add_log(output.to_string());
    }

    if result.timed_out {
        context.add_log(format!("{what}: timed out"));
        context.set_status(IntegrationStatus::Failure);
        return false;
    }

    if result.succeeded {
        info!(project = %context.project_name(), task = %what, "process succeeded");
        context.set_status(IntegrationStatus::Success);
        true
    } else {
        let code = result
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        context.add_log(format!("{what}: failed with exit code {code}"));
        context.set_status(IntegrationStatus::Failure);
        false
    }
}
