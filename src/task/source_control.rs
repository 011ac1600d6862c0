// src/task/source_control.rs

//! Source-control blocks and the tasks bound to them.
//!
//! A project declares named blocks; a source-control task picks one with
//! `use`, or the only one when `use` is unset.

use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use thiserror::Error;

use super::process::execute_and_record;
use super::{ExecutionContext, TaskEnvironment};
use crate::config::validate::ValidationLog;
use crate::exec::{DEFAULT_PROCESS_TIMEOUT, ProcessInfo};

fn default_git() -> String {
    "git".to_string()
}

/// A repository a project builds from.
///
/// ```toml
/// [[project.source_control]]
/// name = "main"
/// repository = "https://example.org/app.git"
/// branch = "main"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SourceControlBlock {
    pub name: String,

    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub branch: Option<String>,

    #[serde(default = "default_git")]
    pub executable: String,
}

impl SourceControlBlock {
    pub fn new(name: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository: repository.into(),
            branch: None,
            executable: default_git(),
        }
    }

    pub fn on_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceControlError {
    #[error("source control block '{0}' not found")]
    BlockNotFound(String),

    #[error("cannot choose a source control block: {0} configured and no `use` given")]
    NotSupported(usize),
}

/// Pick the block a task should operate on.
pub fn resolve_block<'a>(
    blocks: &'a [SourceControlBlock],
    use_block: Option<&str>,
) -> Result<&'a SourceControlBlock, SourceControlError> {
    match use_block {
        Some(name) => blocks
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| SourceControlError::BlockNotFound(name.to_string())),
        None => match blocks {
            [only] => Ok(only),
            _ => Err(SourceControlError::NotSupported(blocks.len())),
        },
    }
}

fn validate_block_reference(
    kind: &str,
    use_block: Option<&str>,
    scope: &str,
    blocks: &[SourceControlBlock],
    log: &mut ValidationLog,
) {
    if let Err(err) = resolve_block(blocks, use_block) {
        log.error(format!("{scope}: {kind} task: {err}"));
    }
}

/// Clone the repository into the working directory, or pull if it is
/// already there.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct GetSourceTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "use")]
    pub use_block: Option<String>,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize_option")]
    pub timeout: Option<Duration>,
}

impl GetSourceTask {
    pub fn using(block: impl Into<String>) -> Self {
        Self {
            use_block: Some(block.into()),
            ..Self::default()
        }
    }

    pub fn process_info(
        &self,
        block: &SourceControlBlock,
        context: &ExecutionContext,
    ) -> ProcessInfo {
        let working_dir = context.working_directory();
        let timeout = self.timeout.unwrap_or(DEFAULT_PROCESS_TIMEOUT);

        if context.file_system().exists(&working_dir.join(".git")) {
            let mut info = ProcessInfo::new(&block.executable)
                .arg("pull")
                .in_dir(working_dir)
                .with_timeout(timeout);
            if let Some(branch) = &block.branch {
                info = info.arg("origin").arg(branch);
            }
            info
        } else {
            let mut info = ProcessInfo::new(&block.executable)
                .arg("clone")
                .with_timeout(timeout);
            if let Some(branch) = &block.branch {
                info = info.arg("--branch").arg(branch);
            }
            info.arg(&block.repository)
                .arg(working_dir.to_string_lossy().into_owned())
        }
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) -> Result<()> {
        let block = resolve_block(env.source_control, self.use_block.as_deref())?;
        let info = self.process_info(block, context);
        execute_and_record("Get source", info, env.executor, context).await;
        Ok(())
    }

    pub fn validate(&self, scope: &str, blocks: &[SourceControlBlock], log: &mut ValidationLog) {
        validate_block_reference("get_source", self.use_block.as_deref(), scope, blocks, log);
    }
}

/// Tag the working copy with the run's label.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyLabelTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "use")]
    pub use_block: Option<String>,

    /// Skip labelling when the run has already failed.
    #[serde(default = "default_true")]
    pub only_on_success: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ApplyLabelTask {
    fn default() -> Self {
        Self {
            name: None,
            use_block: None,
            only_on_success: true,
        }
    }
}

impl ApplyLabelTask {
    pub fn process_info(
        &self,
        block: &SourceControlBlock,
        context: &ExecutionContext,
    ) -> ProcessInfo {
        ProcessInfo::new(&block.executable)
            .arg("tag")
            .arg(context.label())
            .in_dir(context.working_directory())
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) -> Result<()> {
        let block = resolve_block(env.source_control, self.use_block.as_deref())?;
        if self.only_on_success && context.status().is_failed() {
            context.add_log(format!(
                "Not applying label {} to '{}': build has failed",
                context.label(),
                block.name
            ));
            return Ok(());
        }
        let info = self.process_info(block, context);
        execute_and_record("Apply label", info, env.executor, context).await;
        Ok(())
    }

    pub fn validate(&self, scope: &str, blocks: &[SourceControlBlock], log: &mut ValidationLog) {
        validate_block_reference("apply_label", self.use_block.as_deref(), scope, blocks, log);
    }
}
