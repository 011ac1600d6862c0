// src/task/mod.rs

//! Task pipeline: what an integration actually runs.
//!
//! A [`Task`] either performs a side effect and finishes, or hands back a
//! [`ChildTasks`] cursor. The [`driver`] runs each child to completion before
//! asking the cursor for the next one, so a composite task can look at the
//! [`ExecutionContext`] left by the previous child when deciding what comes
//! next.

pub mod build_tool;
pub mod comment;
pub mod conditional;
pub mod context;
pub mod driver;
pub mod force_build;
pub mod merge_files;
pub mod parallel;
pub mod process;
pub mod sequence;
pub mod source_control;

use anyhow::Result;
use serde::Deserialize;

use crate::config::validate::ValidationLog;
use crate::exec::ProcessExecutor;
use crate::remote::{Connector, RemoteEndpoint};

pub use build_tool::{MsBuildTask, NAntTask};
pub use comment::{CommentTask, NullTask};
pub use conditional::{ConditionalTask, TaskCondition};
pub use context::ExecutionContext;
pub use driver::run_task_tree;
pub use force_build::ForceBuildTask;
pub use merge_files::{MergeFile, MergeFilesTask};
pub use parallel::ParallelTask;
pub use sequence::SequenceTask;
pub use source_control::{ApplyLabelTask, GetSourceTask, SourceControlBlock, SourceControlError};

/// Pulls the children of a composite task one at a time.
pub trait ChildTasks<'a>: Send {
    /// The next child to run, given the state the previous child left behind.
    fn next_child(&mut self, context: &ExecutionContext) -> Option<&'a Task>;
}

/// What a task hands back to the driver after running.
pub type Children<'a> = Option<Box<dyn ChildTasks<'a> + 'a>>;

/// Collaborators and identity available to tasks during a run.
///
/// Tasks never own their project; they see it through these borrowed
/// fields for the length of one integration.
pub struct TaskEnvironment<'a> {
    pub server_name: &'a str,
    pub project_name: &'a str,
    pub source_control: &'a [SourceControlBlock],
    pub executor: &'a dyn ProcessExecutor,
    /// Endpoint answering for this server.
    pub local: &'a dyn RemoteEndpoint,
    /// Opens endpoints for other servers.
    pub connector: &'a dyn Connector,
}

/// Every task kind, dispatched by `match`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    Sequence(SequenceTask),
    Parallel(ParallelTask),
    Conditional(ConditionalTask),
    Comment(CommentTask),
    Null(NullTask),
    MergeFiles(MergeFilesTask),
    #[serde(rename = "msbuild")]
    MsBuild(MsBuildTask),
    #[serde(rename = "nant")]
    NAnt(NAntTask),
    GetSource(GetSourceTask),
    ApplyLabel(ApplyLabelTask),
    ForceBuild(ForceBuildTask),
}

impl Task {
    /// Configured name, if any. Only named tasks are addressable remotely.
    pub fn name(&self) -> Option<&str> {
        match self {
            Task::Sequence(t) => t.name.as_deref(),
            Task::Parallel(t) => t.name.as_deref(),
            Task::Conditional(t) => t.name.as_deref(),
            Task::Comment(t) => t.name.as_deref(),
            Task::Null(t) => t.name.as_deref(),
            Task::MergeFiles(t) => t.name.as_deref(),
            Task::MsBuild(t) => t.name.as_deref(),
            Task::NAnt(t) => t.name.as_deref(),
            Task::GetSource(t) => t.name.as_deref(),
            Task::ApplyLabel(t) => t.name.as_deref(),
            Task::ForceBuild(t) => t.name.as_deref(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Task::Sequence(_) => "sequence",
            Task::Parallel(_) => "parallel",
            Task::Conditional(_) => "conditional",
            Task::Comment(_) => "comment",
            Task::Null(_) => "null",
            Task::MergeFiles(_) => "merge_files",
            Task::MsBuild(_) => "msbuild",
            Task::NAnt(_) => "nant",
            Task::GetSource(_) => "get_source",
            Task::ApplyLabel(_) => "apply_label",
            Task::ForceBuild(_) => "force_build",
        }
    }

    /// Name for logs: the configured name or the kind.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or_else(|| self.kind())
    }

    /// Run this task's own work. Children, if any, are run by the driver.
    pub async fn run<'a>(
        &'a self,
        context: &mut ExecutionContext,
        env: &TaskEnvironment<'_>,
    ) -> Result<Children<'a>> {
        match self {
            Task::Sequence(t) => Ok(t.run(context)),
            Task::Parallel(t) => {
                t.run(context, env).await;
                Ok(None)
            }
            Task::Conditional(t) => Ok(t.run(context)),
            Task::Comment(t) => {
                t.run(context);
                Ok(None)
            }
            Task::Null(t) => {
                t.run(context);
                Ok(None)
            }
            Task::MergeFiles(t) => t.run(context).map(|_| None),
            Task::MsBuild(t) => {
                t.run(context, env).await;
                Ok(None)
            }
            Task::NAnt(t) => {
                t.run(context, env).await;
                Ok(None)
            }
            Task::GetSource(t) => t.run(context, env).await.map(|_| None),
            Task::ApplyLabel(t) => t.run(context, env).await.map(|_| None),
            Task::ForceBuild(t) => {
                t.run(context, env).await;
                Ok(None)
            }
        }
    }

    /// Direct children of composite tasks, both branches of a conditional
    /// included.
    pub fn children(&self) -> Vec<&Task> {
        match self {
            Task::Sequence(t) => t.tasks.iter().collect(),
            Task::Parallel(t) => t.tasks.iter().collect(),
            Task::Conditional(t) => t.tasks.iter().chain(&t.else_tasks).collect(),
            _ => Vec::new(),
        }
    }

    /// Depth-first search for a task with the given name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&Task> {
        if self.name().is_some_and(|n| n.eq_ignore_ascii_case(name)) {
            return Some(self);
        }
        self.children().into_iter().find_map(|child| child.find(name))
    }

    /// Append configuration problems to `log`.
    pub fn validate(
        &self,
        scope: &str,
        server_name: &str,
        blocks: &[SourceControlBlock],
        log: &mut ValidationLog,
    ) {
        match self {
            Task::Sequence(_) | Task::Parallel(_) => {}
            Task::Conditional(t) => t.validate(scope, log),
            Task::Comment(_) | Task::Null(_) => {}
            Task::MergeFiles(t) => t.validate(scope, log),
            Task::MsBuild(t) => t.validate(scope, log),
            Task::NAnt(t) => t.validate(scope, log),
            Task::GetSource(t) => t.validate(scope, blocks, log),
            Task::ApplyLabel(t) => t.validate(scope, blocks, log),
            Task::ForceBuild(t) => t.validate(scope, server_name, log),
        }
        for child in self.children() {
            child.validate(scope, server_name, blocks, log);
        }
    }
}

impl From<SequenceTask> for Task {
    fn from(t: SequenceTask) -> Self {
        Task::Sequence(t)
    }
}

impl From<ParallelTask> for Task {
    fn from(t: ParallelTask) -> Self {
        Task::Parallel(t)
    }
}

impl From<ConditionalTask> for Task {
    fn from(t: ConditionalTask) -> Self {
        Task::Conditional(t)
    }
}

impl From<CommentTask> for Task {
    fn from(t: CommentTask) -> Self {
        Task::Comment(t)
    }
}

impl From<NullTask> for Task {
    fn from(t: NullTask) -> Self {
        Task::Null(t)
    }
}

impl From<MergeFilesTask> for Task {
    fn from(t: MergeFilesTask) -> Self {
        Task::MergeFiles(t)
    }
}

impl From<MsBuildTask> for Task {
    fn from(t: MsBuildTask) -> Self {
        Task::MsBuild(t)
    }
}

impl From<NAntTask> for Task {
    fn from(t: NAntTask) -> Self {
        Task::NAnt(t)
    }
}

impl From<GetSourceTask> for Task {
    fn from(t: GetSourceTask) -> Self {
        Task::GetSource(t)
    }
}

impl From<ApplyLabelTask> for Task {
    fn from(t: ApplyLabelTask) -> Self {
        Task::ApplyLabel(t)
    }
}

impl From<ForceBuildTask> for Task {
    fn from(t: ForceBuildTask) -> Self {
        Task::ForceBuild(t)
    }
}
