// src/fs/mock.rs

//! In-memory [`FileSystem`] for tests.

use super::FileSystem;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
    /// Paths for which `atomic_save` fails, to simulate a full disk.
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            self.add_dir(parent);
        }
        self.files.lock().insert(path, content.into());
    }

    fn add_dir(&self, path: &Path) {
        let mut dirs = self.dirs.lock();
        let mut current = Some(path);
        while let Some(p) = current {
            if p.as_os_str().is_empty() || !dirs.insert(p.to_path_buf()) {
                break;
            }
            current = p.parent();
        }
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.lock().get(path.as_ref()).cloned()
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().contains(path.as_ref())
    }

    pub fn fail_saves_to(&self, path: impl AsRef<Path>) {
        self.failing.lock().insert(path.as_ref().to_path_buf());
    }

    pub fn allow_saves_to(&self, path: impl AsRef<Path>) {
        self.failing.lock().remove(path.as_ref());
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path) || self.dirs.lock().contains(path)
    }

    fn ensure_folder_exists(&self, path: &Path) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn atomic_save(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.failing.lock().contains(path) {
            return Err(anyhow!("simulated write failure: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<String> {
        match self.files.lock().get(path) {
            Some(content) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        let content = self
            .contents(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        self.add_file(to, content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }
}
