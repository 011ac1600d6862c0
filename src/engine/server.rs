// src/engine/server.rs

//! The server: owns the project registry, the shared collaborators and the
//! per-project loops.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::project::Project;
use super::project_loop::run_project_loop;
use crate::clock::Clock;
use crate::errors::{CcnetError, Result};
use crate::exec::ProcessExecutor;
use crate::fs::FileSystem;
use crate::remote::{ActionInvoker, Connector, Urn};
use crate::state::{IntegrationResult, IntegrationStateStore, RunStateStore};
use crate::task::{ExecutionContext, SourceControlBlock, Task, TaskEnvironment, run_task_tree};
use crate::trigger::Trigger;
use crate::types::IntegrationRequest;

/// Upper bound on a loop's sleep between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Lower bound so a trigger that is due but refuses to fire cannot spin.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Collaborators shared by every project on a server.
#[derive(Clone)]
pub struct ServerServices {
    pub clock: Arc<dyn Clock>,
    pub fs: Arc<dyn FileSystem>,
    pub executor: Arc<dyn ProcessExecutor>,
    pub connector: Arc<dyn Connector>,
    pub results: IntegrationStateStore,
    pub run_state: Arc<RunStateStore>,
    pub poll_interval: Duration,
}

/// What an entity URN resolved to.
#[derive(Debug, Clone, Copy)]
pub enum Located<'a> {
    Server,
    Project(&'a Arc<Project>),
    Task(&'a Arc<Project>, &'a Task),
    SourceControl(&'a Arc<Project>, &'a SourceControlBlock),
    Trigger(&'a Arc<Project>, &'a Trigger),
}

/// Finished integration: the persisted result plus the build log.
#[derive(Debug, Clone)]
pub struct Integration {
    pub result: IntegrationResult,
    pub build_log: Vec<String>,
}

pub struct Server {
    name: String,
    projects: Vec<Arc<Project>>,
    services: ServerServices,
    loops: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("name", &self.name)
            .field("projects", &self.project_names())
            .finish()
    }
}

impl Server {
    pub fn new(
        name: impl Into<String>,
        projects: Vec<Project>,
        services: ServerServices,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        let mut seen = HashSet::new();
        for project in &projects {
            if !seen.insert(project.name().to_lowercase()) {
                return Err(CcnetError::ConfigError(format!(
                    "duplicate project name '{}'",
                    project.name()
                )));
            }
        }

        Ok(Arc::new(Self {
            name,
            projects: projects.into_iter().map(Arc::new).collect(),
            services,
            loops: Mutex::new(HashMap::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn services(&self) -> &ServerServices {
        &self.services
    }

    pub fn clock(&self) -> &dyn Clock {
        self.services.clock.as_ref()
    }

    pub fn projects(&self) -> &[Arc<Project>] {
        &self.projects
    }

    pub fn project_names(&self) -> Vec<String> {
        self.projects.iter().map(|p| p.name().to_string()).collect()
    }

    /// Project names match case-insensitively.
    pub fn project(&self, name: &str) -> Option<&Arc<Project>> {
        self.projects
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Endpoint answering remote calls for this server.
    pub fn invoker(self: &Arc<Self>) -> ActionInvoker {
        ActionInvoker::new(Arc::clone(self))
    }

    /// Resolve a URN to this server, one of its projects or a named item of
    /// a project. Items are looked up among tasks, then source control
    /// blocks, then triggers.
    pub fn locate(&self, urn: &Urn) -> Option<Located<'_>> {
        if !urn.is_local_to(&self.name) {
            return None;
        }
        let Some(project_name) = urn.project.as_deref() else {
            return Some(Located::Server);
        };
        let project = self.project(project_name)?;
        let Some(item) = urn.item.as_deref() else {
            return Some(Located::Project(project));
        };
        if let Some(task) = project.root_task().find(item) {
            return Some(Located::Task(project, task));
        }
        if let Some(block) = project
            .source_control()
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(item))
        {
            return Some(Located::SourceControl(project, block));
        }
        project
            .configured_trigger()
            .and_then(|trigger| trigger.find(item))
            .map(|trigger| Located::Trigger(project, trigger))
    }

    /// Spawn loops for every project not recorded as stopped.
    pub fn start_all(self: &Arc<Self>) -> Result<()> {
        for project in &self.projects {
            if self.services.run_state.is_startable(project.name())? {
                self.spawn_loop(project)?;
            } else {
                info!(project = %project.name(), "project recorded as stopped; not starting");
            }
        }
        Ok(())
    }

    /// Operator start: records the intent, then spawns the loop. Nothing
    /// starts if the intent cannot be saved.
    pub fn start_project(self: &Arc<Self>, name: &str) -> Result<()> {
        let project = self
            .project(name)
            .ok_or_else(|| CcnetError::ProjectNotFound(name.to_string()))?;
        project.ensure_can_start()?;
        self.services.run_state.set_startable(project.name(), true)?;
        self.spawn_loop(project)
    }

    /// Operator stop: records the intent, then asks the loop to finish. The
    /// integration in progress, if any, runs to completion. The loop keeps
    /// going if the intent cannot be saved.
    pub fn stop_project(&self, name: &str) -> Result<()> {
        let project = self
            .project(name)
            .ok_or_else(|| CcnetError::ProjectNotFound(name.to_string()))?;
        project.ensure_can_stop()?;
        self.services.run_state.set_startable(project.name(), false)?;
        project.begin_stop()?;
        info!(project = %project.name(), "stop requested");
        Ok(())
    }

    fn spawn_loop(self: &Arc<Self>, project: &Arc<Project>) -> Result<()> {
        project.begin_start()?;
        let handle = tokio::spawn(run_project_loop(Arc::clone(self), Arc::clone(project)));
        if let Some(previous) = self.loops.lock().insert(project.name().to_string(), handle) {
            // The old loop already reached Stopped, so it is finished or about to be.
            drop(previous);
        }
        info!(project = %project.name(), "project loop started");
        Ok(())
    }

    /// Stop every loop without recording operator intent, then wait for them.
    pub async fn shutdown(&self) {
        for project in &self.projects {
            if project.begin_stop().is_ok() {
                info!(project = %project.name(), "stopping for shutdown");
            }
        }
        let handles: Vec<(String, JoinHandle<()>)> = self.loops.lock().drain().collect();
        for (name, handle) in handles {
            if let Err(err) = handle.await {
                warn!(project = %name, error = %err, "project loop ended abnormally");
            }
        }
    }

    /// Wait for one project's loop to exit.
    pub async fn join_project(&self, name: &str) {
        let handle = self.loops.lock().remove(name);
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(project = %name, error = %err, "project loop ended abnormally");
            }
        }
    }

    /// Poll the project's trigger once and integrate if it fired.
    pub async fn run_iteration(self: &Arc<Self>, project: &Project) -> Result<Option<Integration>> {
        let Some(request) = project.poll_trigger(self.clock()) else {
            return Ok(None);
        };
        self.integrate(project, request).await.map(Some)
    }

    /// Run one integration of `project` end to end and persist the result.
    ///
    /// The trigger is reset before the result is saved, so a failing disk
    /// does not make the trigger fire again on the next poll.
    pub async fn integrate(
        self: &Arc<Self>,
        project: &Project,
        request: IntegrationRequest,
    ) -> Result<Integration> {
        let clock = self.clock();
        let previous = self.previous_result(project);
        let label = previous.next_label();
        let start_time = clock.now();

        info!(
            project = %project.name(),
            label = %label,
            trigger = %request.source_trigger,
            condition = %request.build_condition,
            "integration starting"
        );

        let mut context = ExecutionContext::new(
            project.name(),
            label.clone(),
            project.working_directory(),
            project.artifact_directory(),
            Arc::clone(&self.services.fs),
        )
        .with_build_condition(request.build_condition);
        context.add_log(format!(
            "Integration {label} of '{}' requested by {}",
            project.name(),
            request.source_trigger
        ));

        for dir in [project.working_directory(), project.artifact_directory()] {
            if let Err(err) = self.services.fs.ensure_folder_exists(dir) {
                warn!(project = %project.name(), dir = ?dir, error = %err, "unable to create directory");
            }
        }

        let invoker = self.invoker();
        let env = TaskEnvironment {
            server_name: &self.name,
            project_name: project.name(),
            source_control: project.source_control(),
            executor: self.services.executor.as_ref(),
            local: &invoker,
            connector: self.services.connector.as_ref(),
        };
        run_task_tree(project.root_task(), &mut context, &env).await;

        let status = context.final_status();
        let last_successful_label = if status.is_failed() {
            previous.last_successful_label.clone()
        } else {
            Some(label.clone())
        };
        let result = IntegrationResult {
            project_name: project.name().to_string(),
            label,
            status,
            last_integration_status: previous.status,
            last_successful_label,
            start_time: Some(start_time),
            end_time: Some(clock.now()),
            working_directory: Some(project.working_directory().to_path_buf()),
            artifact_directory: Some(project.artifact_directory().to_path_buf()),
            trigger: Some(request.source_trigger),
        };

        info!(
            project = %project.name(),
            label = %result.label,
            status = %result.status,
            "integration finished"
        );

        project.reset_trigger(clock);
        let build_log = context.build_log().to_vec();
        project.record_integration(result.clone(), build_log.clone());
        self.services.results.save(&result)?;

        Ok(Integration { result, build_log })
    }

    fn previous_result(&self, project: &Project) -> IntegrationResult {
        if let Some(result) = project.last_result() {
            return result;
        }
        let loaded = match self.services.results.load_or_initial(project.name()) {
            Ok(result) => result,
            Err(err) => {
                warn!(project = %project.name(), error = %err, "unable to read previous state");
                IntegrationResult::initial(project.name())
            }
        };
        project.remember_result(loaded.clone());
        loaded
    }

    /// How long a loop may sleep: the poll interval, shortened when the
    /// project's trigger is due sooner.
    pub fn sleep_duration(&self, project: &Project) -> Duration {
        let poll = self.services.poll_interval;
        let Some(next) = project.next_build_time() else {
            return poll;
        };
        let until = (next - self.clock().now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        until.clamp(MIN_POLL_INTERVAL.min(poll), poll)
    }
}
