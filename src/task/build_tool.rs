// src/task/build_tool.rs

//! External build tools: MSBuild and NAnt.
//!
//! Both build a command line from their configuration and the run's label,
//! then hand it to the process executor.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use super::process::execute_and_record;
use super::{ExecutionContext, TaskEnvironment};
use crate::config::validate::ValidationLog;
use crate::exec::{DEFAULT_PROCESS_TIMEOUT, ProcessInfo};

fn default_msbuild() -> String {
    "msbuild".to_string()
}

fn default_nant() -> String {
    "nant".to_string()
}

/// ```toml
/// [[project.tasks]]
/// type = "msbuild"
/// project_file = "Solution.sln"
/// targets = ["Build"]
/// properties = { Configuration = "Release" }
/// timeout = "10m"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct MsBuildTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_msbuild")]
    pub executable: String,

    #[serde(default)]
    pub project_file: Option<String>,

    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    /// Extra arguments passed through verbatim.
    #[serde(default)]
    pub build_args: Vec<String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize_option")]
    pub timeout: Option<Duration>,
}

impl MsBuildTask {
    pub fn new(project_file: impl Into<String>) -> Self {
        Self {
            name: None,
            executable: default_msbuild(),
            project_file: Some(project_file.into()),
            targets: Vec::new(),
            properties: BTreeMap::new(),
            build_args: Vec::new(),
            working_directory: None,
            timeout: None,
        }
    }

    pub fn arguments(&self, label: &str) -> Vec<String> {
        let mut args = vec!["/nologo".to_string()];
        if !self.targets.is_empty() {
            args.push(format!("/t:{}", self.targets.join(";")));
        }

        let mut props = vec![format!("CCNetLabel={label}")];
        props.extend(self.properties.iter().map(|(k, v)| format!("{k}={v}")));
        args.push(format!("/p:{}", props.join(";")));

        args.extend(self.build_args.iter().cloned());
        if let Some(file) = &self.project_file {
            args.push(file.clone());
        }
        args
    }

    pub fn process_info(&self, context: &ExecutionContext) -> ProcessInfo {
        build_process_info(
            &self.executable,
            self.arguments(context.label()),
            self.working_directory.as_ref(),
            self.timeout,
            context,
        )
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) -> bool {
        let info = self.process_info(context);
        execute_and_record("MSBuild", info, env.executor, context).await
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.project_file.as_deref().is_none_or(|f| f.trim().is_empty()) {
            log.error(format!("{scope}: msbuild task requires a project_file"));
        }
        if self.executable.trim().is_empty() {
            log.error(format!("{scope}: msbuild task has an empty executable"));
        }
    }
}

/// ```toml
/// [[project.tasks]]
/// type = "nant"
/// build_file = "default.build"
/// targets = ["clean", "test"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct NAntTask {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_nant")]
    pub executable: String,

    #[serde(default)]
    pub build_file: Option<String>,

    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,

    #[serde(default)]
    pub build_args: Vec<String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    #[serde(default, deserialize_with = "crate::config::duration::deserialize_option")]
    pub timeout: Option<Duration>,
}

impl NAntTask {
    pub fn new(build_file: impl Into<String>) -> Self {
        Self {
            name: None,
            executable: default_nant(),
            build_file: Some(build_file.into()),
            targets: Vec::new(),
            properties: BTreeMap::new(),
            build_args: Vec::new(),
            working_directory: None,
            timeout: None,
        }
    }

    pub fn arguments(&self, label: &str) -> Vec<String> {
        let mut args = vec!["-nologo".to_string()];
        if let Some(file) = &self.build_file {
            args.push(format!("-buildfile:{file}"));
        }
        args.push(format!("-D:label-to-apply={label}"));
        args.extend(self.properties.iter().map(|(k, v)| format!("-D:{k}={v}")));
        args.extend(self.build_args.iter().cloned());
        args.extend(self.targets.iter().cloned());
        args
    }

    pub fn process_info(&self, context: &ExecutionContext) -> ProcessInfo {
        build_process_info(
            &self.executable,
            self.arguments(context.label()),
            self.working_directory.as_ref(),
            self.timeout,
            context,
        )
    }

    pub async fn run(&self, context: &mut ExecutionContext, env: &TaskEnvironment<'_>) -> bool {
        let info = self.process_info(context);
        execute_and_record("NAnt", info, env.executor, context).await
    }

    pub fn validate(&self, scope: &str, log: &mut ValidationLog) {
        if self.build_file.as_deref().is_none_or(|f| f.trim().is_empty()) {
            log.error(format!("{scope}: nant task requires a build_file"));
        }
        if self.executable.trim().is_empty() {
            log.error(format!("{scope}: nant task has an empty executable"));
        }
    }
}

fn build_process_info(
    executable: &str,
    arguments: Vec<String>,
    working_directory: Option<&PathBuf>,
    timeout: Option<Duration>,
    context: &ExecutionContext,
) -> ProcessInfo {
    let dir = match working_directory {
        Some(dir) => context.resolve_working_path(dir),
        None => context.working_directory().to_path_buf(),
    };
    ProcessInfo::new(executable)
        .args(arguments)
        .in_dir(dir)
        .with_timeout(timeout.unwrap_or(DEFAULT_PROCESS_TIMEOUT))
}
