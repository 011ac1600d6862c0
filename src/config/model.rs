// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::DEFAULT_POLL_INTERVAL;
use crate::remote::DEFAULT_REMOTE_TIMEOUT;
use crate::task::{SourceControlBlock, Task};
use crate::trigger::Trigger;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [server]
/// name = "local"
/// state_dir = "state"
///
/// [[project]]
/// name = "alpha"
/// working_directory = "work/alpha"
/// artifact_directory = "artifacts/alpha"
///
/// [project.trigger]
/// type = "interval"
/// period = "5m"
///
/// [[project.tasks]]
/// type = "comment"
/// text = "start"
/// ```
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub server: ServerSection,

    /// All projects from `[[project]]`.
    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectConfig>,
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Used as the server segment of URNs.
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Upper bound on how long a project loop sleeps between polls.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub poll_interval: Duration,

    /// Timeout for calls to other servers.
    #[serde(
        default = "default_remote_timeout",
        deserialize_with = "crate::config::duration::deserialize"
    )]
    pub remote_timeout: Duration,

    /// `host:port` for the HTTP endpoint, if any.
    #[serde(default)]
    pub http_listen: Option<String>,

    /// `host:port` for the persistent-socket endpoint, if any.
    #[serde(default)]
    pub tcp_listen: Option<String>,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("state")
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

fn default_remote_timeout() -> Duration {
    DEFAULT_REMOTE_TIMEOUT
}

/// `[[project]]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: String,

    /// Defaults to `work/<name>`.
    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    /// Defaults to `artifacts/<name>`.
    #[serde(default)]
    pub artifact_directory: Option<PathBuf>,

    /// Without a trigger the project only builds when forced.
    #[serde(default)]
    pub trigger: Option<Trigger>,

    #[serde(default)]
    pub source_control: Vec<SourceControlBlock>,

    /// Run in order as the project's root sequence.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl ProjectConfig {
    pub fn working_directory(&self) -> PathBuf {
        self.working_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("work").join(&self.name))
    }

    pub fn artifact_directory(&self) -> PathBuf {
        self.artifact_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("artifacts").join(&self.name))
    }
}
