//! Last-seen revision checkpoint
//!
//! The state file is a flat JSON object mapping each tracked path to the
//! newest revision observed for it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{NotifyError, Result};

/// Tracked path -> last-seen revision
pub type PersistedState = BTreeMap<String, String>;

/// Reads and writes the state file
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, or an empty one if the file does not exist
    pub fn load(&self) -> Result<PersistedState> {
        debug!(path = %self.path.display(), "StateStore::load: called");
        if !self.path.exists() {
            debug!("StateStore::load: no state file, starting empty");
            return Ok(PersistedState::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| NotifyError::file_access(&self.path, e))?;
        let state: PersistedState =
            serde_json::from_str(&content).map_err(|e| NotifyError::parse(&self.path, e))?;

        debug!(entries = state.len(), "StateStore::load: loaded");
        Ok(state)
    }

    /// Overwrite the state file
    ///
    /// Not atomic: a crash mid-write can leave a truncated file behind.
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        debug!(path = %self.path.display(), entries = state.len(), "StateStore::save: called");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| NotifyError::file_access(parent, e))?;
        }

        let content = serde_json::to_string_pretty(state).map_err(|e| NotifyError::parse(&self.path, e))?;
        fs::write(&self.path, content).map_err(|e| NotifyError::file_access(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("status.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = StateStore::new(temp.path().join("nested").join("status.json"));

        let mut state = PersistedState::new();
        state.insert("/js/src/vm/Opcodes.h".to_string(), "4f5c2a7e9b1d".to_string());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_reads_flat_object_written_elsewhere() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("status.json");
        fs::write(&path, r#"{"/a": "111", "/b": "222"}"#).unwrap();

        let state = StateStore::new(&path).load().unwrap();
        assert_eq!(state.get("/a").map(String::as_str), Some("111"));
        assert_eq!(state.get("/b").map(String::as_str), Some("222"));
    }

    #[test]
    fn test_load_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("status.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let err = StateStore::new(&path).load().unwrap_err();
        assert!(matches!(err, NotifyError::Parse { .. }));
    }

    #[test]
    fn test_load_unreadable() {
        let temp = TempDir::new().unwrap();
        // A directory exists at the path but cannot be read as a file
        let err = StateStore::new(temp.path()).load().unwrap_err();
        assert!(matches!(err, NotifyError::FileAccess { .. }));
    }
}
