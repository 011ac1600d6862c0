// src/task/context.rs

//! Mutable state threaded through one integration run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::types::{BuildCondition, IntegrationStatus};

/// Status, build log and imported artifacts of a single run.
///
/// Owned by the scheduling loop for the duration of the run and handed to
/// every task in turn.
#[derive(Debug)]
pub struct ExecutionContext {
    project_name: String,
    label: String,
    working_directory: PathBuf,
    artifact_directory: PathBuf,
    status: IntegrationStatus,
    build_condition: BuildCondition,
    build_log: Vec<String>,
    imported: Vec<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl ExecutionContext {
    pub fn new(
        project_name: impl Into<String>,
        label: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        artifact_directory: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            label: label.into(),
            working_directory: working_directory.into(),
            artifact_directory: artifact_directory.into(),
            status: IntegrationStatus::Unknown,
            build_condition: BuildCondition::default(),
            build_log: Vec::new(),
            imported: Vec::new(),
            fs,
        }
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn artifact_directory(&self) -> &Path {
        &self.artifact_directory
    }

    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Condition carried by the request that started this run.
    pub fn build_condition(&self) -> BuildCondition {
        self.build_condition
    }

    pub fn with_build_condition(mut self, condition: BuildCondition) -> Self {
        self.build_condition = condition;
        self
    }

    /// A blank context for the same run: same project, label, directories
    /// and condition, but no status, log or artifacts yet.
    pub fn fork(&self) -> Self {
        Self {
            project_name: self.project_name.clone(),
            label: self.label.clone(),
            working_directory: self.working_directory.clone(),
            artifact_directory: self.artifact_directory.clone(),
            status: IntegrationStatus::Unknown,
            build_condition: self.build_condition,
            build_log: Vec::new(),
            imported: Vec::new(),
            fs: Arc::clone(&self.fs),
        }
    }

    /// Fold a forked context back in: its status escalates this one, its log
    /// and artifacts are appended.
    pub fn merge(&mut self, fork: ExecutionContext) {
        if fork.status != IntegrationStatus::Unknown {
            self.set_status(fork.status);
        }
        self.build_log.extend(fork.build_log);
        self.imported.extend(fork.imported);
    }

    pub fn status(&self) -> IntegrationStatus {
        self.status
    }

    /// Record a task outcome. The status only ever becomes more severe, so a
    /// later success cannot hide an earlier failure.
    pub fn set_status(&mut self, status: IntegrationStatus) {
        if status < self.status {
            debug!(
                project = %self.project_name,
                current = %self.status,
                ignored = %status,
                "keeping more severe status"
            );
            return;
        }
        self.status = status;
    }

    /// Final status of the run: `Unknown` (nothing reported) counts as success.
    pub fn final_status(&self) -> IntegrationStatus {
        match self.status {
            IntegrationStatus::Unknown => IntegrationStatus::Success,
            other => other,
        }
    }

    pub fn add_log(&mut self, entry: impl Into<String>) {
        let entry = entry.into();
        debug!(project = %self.project_name, "{}", entry);
        self.build_log.push(entry);
    }

    pub fn build_log(&self) -> &[String] {
        &self.build_log
    }

    pub fn log_contains(&self, needle: &str) -> bool {
        self.build_log.iter().any(|line| line.contains(needle))
    }

    /// Resolve `path` against the working directory unless it is absolute.
    pub fn resolve_working_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_directory.join(path)
        }
    }

    /// Folder artifacts of this run are imported into: the artifact
    /// directory's per-label folder, or `target` below it (an absolute
    /// `target` is used as is).
    pub fn artifact_folder(&self, target: Option<&Path>) -> PathBuf {
        let base = self.artifact_directory.join(&self.label);
        match target {
            Some(t) if t.is_absolute() => t.to_path_buf(),
            Some(t) => base.join(t),
            None => base,
        }
    }

    /// Copy `source` into `target_folder` and remember it as an artifact of
    /// this run, removing the source afterwards if asked to.
    pub fn import_file(
        &mut self,
        source: &Path,
        target_folder: &Path,
        delete_source: bool,
    ) -> Result<PathBuf> {
        let file_name = source
            .file_name()
            .with_context(|| format!("artifact source {:?} has no file name", source))?;
        let destination = target_folder.join(file_name);

        self.fs.ensure_folder_exists(target_folder)?;
        self.fs.copy_file(source, &destination)?;
        if delete_source {
            self.fs.remove_file(source)?;
        }

        info!(
            project = %self.project_name,
            source = ?source,
            destination = ?destination,
            deleted_source = delete_source,
            "imported artifact"
        );
        self.imported.push(destination.clone());
        Ok(destination)
    }

    pub fn imported_files(&self) -> &[PathBuf] {
        &self.imported
    }
}
