// src/engine/project_loop.rs

use std::sync::Arc;

use tracing::{debug, error, info};

use super::project::Project;
use super::server::Server;

/// Per-project scheduling loop.
///
/// Polls the project's trigger, integrates when it fires and sleeps until
/// the next poll. Stop requests are honoured between iterations, so an
/// integration that has started always finishes. Each iteration runs in its
/// own task: an error or a panic is logged and the loop carries on.
pub async fn run_project_loop(server: Arc<Server>, project: Arc<Project>) {
    project.mark_running();
    project.initialise_triggers(server.clock());
    info!(project = %project.name(), "project running");

    while !project.stop_requested() {
        let iteration = {
            let server = Arc::clone(&server);
            let project = Arc::clone(&project);
            tokio::spawn(async move { server.run_iteration(&project).await })
        };

        match iteration.await {
            Ok(Ok(Some(integration))) => debug!(
                project = %project.name(),
                label = %integration.result.label,
                status = %integration.result.status,
                "iteration integrated"
            ),
            Ok(Ok(None)) => {}
            Ok(Err(err)) => {
                error!(project = %project.name(), error = %err, "integration iteration failed");
            }
            Err(err) => {
                error!(project = %project.name(), error = %err, "integration iteration panicked");
            }
        }

        if project.stop_requested() {
            break;
        }

        let pause = server.sleep_duration(&project);
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = project.woken() => {
                debug!(project = %project.name(), "woken early");
            }
        }
    }

    project.clean_up_triggers();
    project.mark_stopped();
    info!(project = %project.name(), "project loop exited");
}
