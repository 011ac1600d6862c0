// src/task/merge_files.rs

use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tracing::warn;

use super::ExecutionContext;
use crate::config::validate::ValidationLog;

/// One file to import into the run's artifacts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MergeFile {
    /// Relative paths resolve against the working directory.
    pub path: PathBuf,

    #[serde(default)]
    pub delete_source: bool,
}

impl MergeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delete_source: false,
        }
    }

    pub fn deleting_source(mut self) -> Self {
        self.delete_source = true;
        self
    }
}

/// Imports build outputs (test reports, coverage files) into the artifact
/// folder of the current label.
///
/// ```toml
/// [[project.tasks]]
/// type = "merge_files"
/// target = "reports"
/// files = [{ path = "out/tests.xml", delete_source = true }]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MergeFilesTask {
    #[serde(default)]
    pub name: Option<String>,

    /// Folder below `<artifact_dir>/<label>`; absolute paths are used as is.
    #[serde(default)]
    pub target: Option<PathBuf>,

    #[serde(default)]
    pub files: Vec<MergeFile>,
}

impl MergeFilesTask {
    pub fn new(files: Vec<MergeFile>) -> Self {
        Self {
            name: None,
            target: None,
            files,
        }
    }

    pub fn run(&self, context: &mut ExecutionContext) -> Result<()> {
        let target = context.artifact_folder(self.target.as_deref());

        for file in &self.files {
            let source = context.resolve_working_path(&file.path);
            if !context.file_system().exists(&source) {
                warn!(project = %context.project_name(), file = ?source, "file to merge not found");
                context.add_log(format!("Merge file {} not found, skipping", source.display()));
                continue;
            }

            let destination = context.import_file(&source, &target, file.delete_source)?;
            context.add_log(format!(
                "Merged {} into {}",
                source.display(),
                destination.display()
            ));
        }
        Ok(())
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.files.is_empty() {
            log.warning(format!("{scope}: merge_files task has no files"));
        }
    }
}
