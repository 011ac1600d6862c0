// src/engine/project.rs

//! A configured project and its runtime control state.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::errors::{CcnetError, Result};
use crate::state::IntegrationResult;
use crate::task::{SequenceTask, SourceControlBlock, Task};
use crate::trigger::{ForceFlag, ForceTrigger, MultipleTrigger, Trigger};
use crate::types::{IntegrationRequest, ProjectState};

/// Everything the server knows about one project.
///
/// Configuration fields are immutable after construction. The trigger,
/// lifecycle state and last result sit behind locks that are only held
/// briefly, never across an `.await`.
#[derive(Debug)]
pub struct Project {
    name: String,
    working_directory: PathBuf,
    artifact_directory: PathBuf,
    source_control: Vec<SourceControlBlock>,
    root: Task,
    configured_trigger: Option<Trigger>,
    trigger: Mutex<Trigger>,
    force: ForceFlag,
    state: Mutex<ProjectState>,
    wake: Notify,
    last_result: Mutex<Option<IntegrationResult>>,
    last_build_log: Mutex<Vec<String>>,
}

impl Project {
    pub fn new(
        name: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        artifact_directory: impl Into<PathBuf>,
        trigger: Option<Trigger>,
        source_control: Vec<SourceControlBlock>,
        root: Task,
    ) -> Self {
        let force = ForceFlag::new();

        // Remote force-build requests arrive through their own trigger,
        // polled alongside whatever is configured.
        let mut triggers = vec![Trigger::from(ForceTrigger::new(force.clone()))];
        triggers.extend(trigger.clone());
        let effective = Trigger::from(MultipleTrigger::any(triggers));

        Self {
            name: name.into(),
            working_directory: working_directory.into(),
            artifact_directory: artifact_directory.into(),
            source_control,
            root,
            configured_trigger: trigger,
            trigger: Mutex::new(effective),
            force,
            state: Mutex::new(ProjectState::Stopped),
            wake: Notify::new(),
            last_result: Mutex::new(None),
            last_build_log: Mutex::new(Vec::new()),
        }
    }

    /// Convenience for a project whose root is a plain sequence of tasks.
    pub fn with_tasks(
        name: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        artifact_directory: impl Into<PathBuf>,
        trigger: Option<Trigger>,
        source_control: Vec<SourceControlBlock>,
        tasks: Vec<Task>,
    ) -> Self {
        Self::new(
            name,
            working_directory,
            artifact_directory,
            trigger,
            source_control,
            Task::from(SequenceTask::new(tasks)),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn artifact_directory(&self) -> &Path {
        &self.artifact_directory
    }

    pub fn source_control(&self) -> &[SourceControlBlock] {
        &self.source_control
    }

    pub fn root_task(&self) -> &Task {
        &self.root
    }

    /// The trigger as configured, without the built-in force trigger.
    pub fn configured_trigger(&self) -> Option<&Trigger> {
        self.configured_trigger.as_ref()
    }

    pub fn state(&self) -> ProjectState {
        *self.state.lock()
    }

    pub fn next_build_time(&self) -> Option<NaiveDateTime> {
        self.trigger.lock().next_time()
    }

    /// Queue a forced integration and wake the loop.
    pub fn force_build(&self, requested_by: impl Into<String>) {
        let requested_by = requested_by.into();
        info!(project = %self.name, requested_by = %requested_by, "force build queued");
        self.force.request(requested_by);
        self.wake.notify_one();
    }

    pub fn force_pending(&self) -> bool {
        self.force.is_set()
    }

    pub fn last_result(&self) -> Option<IntegrationResult> {
        self.last_result.lock().clone()
    }

    pub fn last_build_log(&self) -> Vec<String> {
        self.last_build_log.lock().clone()
    }

    pub(crate) fn record_integration(&self, result: IntegrationResult, build_log: Vec<String>) {
        *self.last_result.lock() = Some(result);
        *self.last_build_log.lock() = build_log;
    }

    pub(crate) fn remember_result(&self, result: IntegrationResult) {
        *self.last_result.lock() = Some(result);
    }

    pub fn initialise_triggers(&self, clock: &dyn Clock) {
        self.trigger.lock().initialise(clock);
    }

    pub fn poll_trigger(&self, clock: &dyn Clock) -> Option<IntegrationRequest> {
        self.trigger.lock().check(clock)
    }

    pub fn reset_trigger(&self, clock: &dyn Clock) {
        self.trigger.lock().reset(clock);
    }

    pub fn clean_up_triggers(&self) {
        self.trigger.lock().clean_up();
    }

    /// Rejects a start unless the project is named and Stopped.
    pub(crate) fn ensure_can_start(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CcnetError::InvalidState {
                project: self.name.clone(),
                message: "a project without a name cannot be started".to_string(),
            });
        }
        match self.state() {
            ProjectState::Stopped => Ok(()),
            other => Err(CcnetError::InvalidState {
                project: self.name.clone(),
                message: format!("cannot start while {other}"),
            }),
        }
    }

    /// Stopped -> Starting. Anything else is rejected.
    pub(crate) fn begin_start(&self) -> Result<()> {
        self.ensure_can_start()?;
        let mut state = self.state.lock();
        let current = *state;
        match current {
            ProjectState::Stopped => {
                *state = ProjectState::Starting;
                Ok(())
            }
            other => Err(CcnetError::InvalidState {
                project: self.name.clone(),
                message: format!("cannot start while {other}"),
            }),
        }
    }

    /// Rejects a stop unless the project is Starting or Running.
    pub(crate) fn ensure_can_stop(&self) -> Result<()> {
        match self.state() {
            ProjectState::Starting | ProjectState::Running => Ok(()),
            other => Err(CcnetError::InvalidState {
                project: self.name.clone(),
                message: format!("cannot stop while {other}"),
            }),
        }
    }

    /// Starting/Running -> Stopping, waking the loop if it is asleep.
    pub(crate) fn begin_stop(&self) -> Result<()> {
        let mut state = self.state.lock();
        let current = *state;
        match current {
            ProjectState::Starting | ProjectState::Running => {
                *state = ProjectState::Stopping;
                drop(state);
                self.wake.notify_one();
                Ok(())
            }
            other => Err(CcnetError::InvalidState {
                project: self.name.clone(),
                message: format!("cannot stop while {other}"),
            }),
        }
    }

    pub(crate) fn mark_running(&self) {
        let mut state = self.state.lock();
        if *state == ProjectState::Starting {
            *state = ProjectState::Running;
        }
    }

    pub(crate) fn mark_stopped(&self) {
        *self.state.lock() = ProjectState::Stopped;
        debug!(project = %self.name, "project stopped");
    }

    pub fn stop_requested(&self) -> bool {
        matches!(*self.state.lock(), ProjectState::Stopping | ProjectState::Stopped)
    }

    /// Resolves once someone calls [`force_build`](Self::force_build) or
    /// asks the project to stop.
    pub(crate) async fn woken(&self) {
        self.wake.notified().await;
    }
}
