//! Whole-document snapshot storage for one tenant.
//!
//! Two JSON documents per tenant under `<data_dir>/tenants/<tenant_id>/`:
//! `timer_config.json` and `timer_state.json`. Each save rewrites the full
//! document; snapshot size stays bounded by the event-log cap.

use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};
use crate::timer::config::TimerConfig;
use crate::timer::state::TimerState;

/// Paths and load/save for one tenant's persisted documents.
#[derive(Debug, Clone)]
pub struct TenantStore {
    dir: PathBuf,
}

impl TenantStore {
    /// Store rooted at `<data_dir>/tenants/<tenant_id>/`.
    ///
    /// # Errors
    /// Returns an error if the tenant directory cannot be created.
    pub fn new(data_dir: &Path, tenant_id: &str) -> Result<Self> {
        let dir = data_dir.join("tenants").join(tenant_id);
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::DataDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("timer_config.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join("timer_state.json")
    }

    pub fn emergency_path(&self) -> PathBuf {
        self.dir.join("emergency_events.jsonl")
    }

    /// Load the config document, or defaults if none has been written yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_config(&self) -> Result<TimerConfig> {
        self.load_document(&self.config_path())
    }

    /// Load the state document, or defaults if none has been written yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_state(&self) -> Result<TimerState> {
        self.load_document(&self.state_path())
    }

    /// Persist the config document.
    ///
    /// # Errors
    /// Returns an error if the document cannot be serialized or written.
    pub fn save_config(&self, config: &TimerConfig) -> Result<()> {
        self.save_document(&self.config_path(), config)
    }

    /// Persist the state document.
    ///
    /// # Errors
    /// Returns an error if the document cannot be serialized or written.
    pub fn save_state(&self, state: &TimerState) -> Result<()> {
        self.save_document(&self.state_path(), state)
    }

    fn load_document<T>(&self, path: &Path) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| StorageError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| {
            StorageError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
    }

    fn save_document<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).map_err(|e| StorageError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| {
            StorageError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_documents_load_as_defaults() {
        let tmp = TempDir::new().unwrap();
        let store = TenantStore::new(tmp.path(), "streamer1").unwrap();
        assert_eq!(store.load_state().unwrap(), TimerState::default());
        let cfg = store.load_config().unwrap();
        assert_eq!(cfg.min_duration_seconds, 86_400);
    }

    #[test]
    fn save_and_reload_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = TenantStore::new(tmp.path(), "streamer1").unwrap();

        let mut state = TimerState::default();
        state.total_added_seconds = 420;
        state.is_paused = true;
        store.save_state(&state).unwrap();

        let mut config = TimerConfig::default();
        config.min_bits_to_trigger = 250;
        store.save_config(&config).unwrap();

        assert_eq!(store.load_state().unwrap(), state);
        assert_eq!(store.load_config().unwrap(), config);
    }

    #[test]
    fn corrupt_document_is_an_error_not_a_default() {
        let tmp = TempDir::new().unwrap();
        let store = TenantStore::new(tmp.path(), "streamer1").unwrap();
        std::fs::write(store.state_path(), "{not json").unwrap();
        assert!(store.load_state().is_err());
    }

    #[test]
    fn tenants_get_separate_directories() {
        let tmp = TempDir::new().unwrap();
        let a = TenantStore::new(tmp.path(), "a").unwrap();
        let b = TenantStore::new(tmp.path(), "b").unwrap();
        assert_ne!(a.state_path(), b.state_path());
    }
}
