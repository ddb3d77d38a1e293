//! Persistence for staged and active configuration text.
//!
//! The applier only needs a read/write byte-stream to two slots; where
//! those bytes live (files, memory) is the collaborator's choice.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;

/// Storage for the two configuration slots an applier manages.
pub trait ConfigStore {
    /// Persists the staged configuration text.
    fn save_staged(&mut self, text: &str) -> Result<()>;

    /// Loads the staged configuration text, if any.
    fn load_staged(&self) -> Result<Option<String>>;

    /// Removes the staged configuration.
    fn clear_staged(&mut self) -> Result<()>;

    /// Persists the active configuration text.
    fn save_active(&mut self, text: &str) -> Result<()>;

    /// Loads the active configuration text, if any.
    fn load_active(&self) -> Result<Option<String>>;

    /// Removes the active configuration.
    fn clear_active(&mut self) -> Result<()>;
}

/// In-memory store, for tests and ephemeral use.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    staged: Option<String>,
    active: Option<String>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn save_staged(&mut self, text: &str) -> Result<()> {
        self.staged = Some(text.to_string());
        Ok(())
    }

    fn load_staged(&self) -> Result<Option<String>> {
        Ok(self.staged.clone())
    }

    fn clear_staged(&mut self) -> Result<()> {
        self.staged = None;
        Ok(())
    }

    fn save_active(&mut self, text: &str) -> Result<()> {
        self.active = Some(text.to_string());
        Ok(())
    }

    fn load_active(&self) -> Result<Option<String>> {
        Ok(self.active.clone())
    }

    fn clear_active(&mut self) -> Result<()> {
        self.active = None;
        Ok(())
    }
}

/// File-backed store: staged and active slots at collaborator-chosen paths,
/// written as UTF-8.
#[derive(Clone, Debug)]
pub struct FileStore {
    staged_path: PathBuf,
    active_path: PathBuf,
}

impl FileStore {
    /// Creates a store over the given paths.
    #[must_use]
    pub fn new(staged_path: impl Into<PathBuf>, active_path: impl Into<PathBuf>) -> Self {
        Self {
            staged_path: staged_path.into(),
            active_path: active_path.into(),
        }
    }

    /// Returns the staged slot's path.
    #[must_use]
    pub fn staged_path(&self) -> &Path {
        &self.staged_path
    }

    /// Returns the active slot's path.
    #[must_use]
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    fn read_slot(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn remove_slot(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl ConfigStore for FileStore {
    fn save_staged(&mut self, text: &str) -> Result<()> {
        fs::write(&self.staged_path, text)?;
        debug!(path = %self.staged_path.display(), "wrote staged config");
        Ok(())
    }

    fn load_staged(&self) -> Result<Option<String>> {
        Self::read_slot(&self.staged_path)
    }

    fn clear_staged(&mut self) -> Result<()> {
        Self::remove_slot(&self.staged_path)
    }

    fn save_active(&mut self, text: &str) -> Result<()> {
        fs::write(&self.active_path, text)?;
        debug!(path = %self.active_path.display(), "wrote active config");
        Ok(())
    }

    fn load_active(&self) -> Result<Option<String>> {
        Self::read_slot(&self.active_path)
    }

    fn clear_active(&mut self) -> Result<()> {
        Self::remove_slot(&self.active_path)
    }
}
