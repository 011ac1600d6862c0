// src/state/run_state.rs

//! Server-wide record of which projects an operator has stopped.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::StateError;
use crate::fs::FileSystem;

pub const RUN_STATE_FILE: &str = "ProjectsState.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct RunStateDocument {
    #[serde(default)]
    stopped: BTreeSet<String>,
}

/// Lazily-loaded stopped list. The file is read on first use and rewritten
/// in full whenever an entry changes. A project that is not listed is
/// startable.
#[derive(Debug)]
pub struct RunStateStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    stopped: Mutex<Option<BTreeSet<String>>>,
}

impl RunStateStore {
    pub fn new(dir: impl AsRef<Path>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: dir.as_ref().join(RUN_STATE_FILE),
            fs,
            stopped: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_startable(&self, project_name: &str) -> Result<bool, StateError> {
        let mut guard = self.stopped.lock();
        let stopped = self.loaded(&mut guard)?;
        Ok(!stopped.contains(project_name))
    }

    pub fn stopped_projects(&self) -> Result<Vec<String>, StateError> {
        let mut guard = self.stopped.lock();
        Ok(self.loaded(&mut guard)?.iter().cloned().collect())
    }

    /// Record whether `project_name` may be started. Only writes when the
    /// entry actually changes.
    pub fn set_startable(&self, project_name: &str, startable: bool) -> Result<(), StateError> {
        let mut guard = self.stopped.lock();
        let stopped = self.loaded(&mut guard)?;

        let changed = if startable {
            stopped.remove(project_name)
        } else {
            stopped.insert(project_name.to_string())
        };
        if !changed {
            return Ok(());
        }

        let document = RunStateDocument {
            stopped: stopped.clone(),
        };
        let json = serde_json::to_string_pretty(&document).map_err(|e| StateError::Persist {
            path: self.path.clone(),
            source: e.into(),
        })?;
        if let Some(parent) = self.path.parent() {
            self.fs
                .ensure_folder_exists(parent)
                .map_err(|source| StateError::Persist {
                    path: self.path.clone(),
                    source,
                })?;
        }
        self.fs
            .atomic_save(&self.path, json.as_bytes())
            .map_err(|source| StateError::Persist {
                path: self.path.clone(),
                source,
            })?;

        info!(project = %project_name, startable, "recorded project run state");
        Ok(())
    }

    fn loaded<'a>(
        &self,
        slot: &'a mut Option<BTreeSet<String>>,
    ) -> Result<&'a mut BTreeSet<String>, StateError> {
        if slot.is_none() {
            *slot = Some(self.read_document()?);
        }
        Ok(slot.get_or_insert_with(BTreeSet::new))
    }

    fn read_document(&self) -> Result<BTreeSet<String>, StateError> {
        if !self.fs.exists(&self.path) {
            return Ok(BTreeSet::new());
        }
        let contents = self.fs.load(&self.path).map_err(|source| StateError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document: RunStateDocument =
            serde_json::from_str(&contents).map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })?;
        Ok(document.stopped)
    }
}
