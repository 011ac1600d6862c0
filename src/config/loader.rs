// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::warn;

use crate::clock::Clock;
use crate::config::model::ConfigFile;
use crate::config::validate::{ValidationLog, validate_config};
use crate::engine::{Project, Server, ServerServices};
use crate::errors::Result;
use crate::exec::ProcessExecutor;
use crate::fs::FileSystem;
use crate::remote::Connector;
use crate::state::{IntegrationStateStore, RunStateStore};

/// A validated configuration plus where it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ConfigFile,
    /// Directory relative paths in the file are resolved against.
    pub base_dir: PathBuf,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.config.server.state_dir)
    }
}

/// Load a configuration file from a given path and return the raw `ConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;
    parse_config(&contents).with_context(|| format!("parsing TOML config from {:?}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<ConfigFile> {
    Ok(toml::from_str(contents)?)
}

/// Load a configuration file from path and run validation.
///
/// Any validation error aborts with [`CcnetError::Validation`] listing every
/// finding; warnings are logged and returned alongside the config.
///
/// [`CcnetError::Validation`]: crate::errors::CcnetError::Validation
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<LoadedConfig> {
    let path = path.as_ref();
    let config = load_from_path(path)?;

    let mut log = ValidationLog::new();
    validate_config(&config, &mut log);
    let warnings = log.into_result()?;
    for warning in &warnings {
        warn!(config = ?path, "{}", warning);
    }

    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(LoadedConfig {
        config,
        base_dir,
        warnings,
    })
}

/// Helper to resolve a default config path: `ccnet.toml` in the current
/// working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("ccnet.toml")
}

/// Build a server from a validated configuration and its collaborators.
pub fn build_server(
    loaded: &LoadedConfig,
    clock: Arc<dyn Clock>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn ProcessExecutor>,
    connector: Arc<dyn Connector>,
) -> Result<Arc<Server>> {
    let state_dir = loaded.state_dir();
    let server_cfg = &loaded.config.server;

    let projects = loaded
        .config
        .projects
        .iter()
        .map(|p| {
            Project::with_tasks(
                p.name.trim(),
                loaded.resolve(&p.working_directory()),
                loaded.resolve(&p.artifact_directory()),
                p.trigger.clone(),
                p.source_control.clone(),
                p.tasks.clone(),
            )
        })
        .collect();

    let services = ServerServices {
        clock,
        results: IntegrationStateStore::new(&state_dir, Arc::clone(&fs)),
        run_state: Arc::new(RunStateStore::new(&state_dir, Arc::clone(&fs))),
        fs,
        executor,
        connector,
        poll_interval: server_cfg.poll_interval,
    };

    Server::new(server_cfg.name.trim(), projects, services)
}
