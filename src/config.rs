//! Manager configuration: which storage backend to use, whether to
//! auto-sync on an interval, and whether to serialize access behind a
//! single lock. Loads from a JSON file next to the data directory, falling
//! back to defaults when none exists yet.

use crate::error::{FileMetaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const CONFIG_FILENAME: &str = "filemeta.config.json";

/// Whether the manager serializes access behind a single lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadSafety {
    Off,
    On,
}

impl Default for ThreadSafety {
    fn default() -> Self {
        ThreadSafety::Off
    }
}

/// Which reference storage backend a manager built from config should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StorageKind {
    Memory,
    JsonFile { path: String },
    Sqlite { path: String },
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Memory
    }
}

/// Construction options for [`crate::manager::FileMeta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetaConfig {
    #[serde(default)]
    pub storage: StorageKind,
    #[serde(default)]
    pub auto_sync: bool,
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default)]
    pub thread_safe: ThreadSafety,
}

fn default_sync_interval() -> u64 {
    300
}

impl Default for FileMetaConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::default(),
            auto_sync: false,
            sync_interval_secs: default_sync_interval(),
            thread_safe: ThreadSafety::default(),
        }
    }
}

impl FileMetaConfig {
    /// Loads `filemeta.config.json` from `dir`, or returns defaults if it
    /// doesn't exist.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = dir.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&config_path)?;
        serde_json::from_str(&content).map_err(|e| FileMetaError::Storage(e.to_string()))
    }

    /// Loads from `dir`, writing fresh defaults to disk if no config file
    /// is present yet.
    pub fn load_or_create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config_path = dir.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Self::load(dir);
        }
        let config = Self::default();
        config.save(dir)?;
        Ok(config)
    }

    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| FileMetaError::Storage(e.to_string()))?;
        fs::write(dir.join(CONFIG_FILENAME), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = FileMetaConfig::load(dir.path()).unwrap();
        assert_eq!(config, FileMetaConfig::default());
    }

    #[test]
    fn load_or_create_persists_defaults_on_first_call() {
        let dir = tempdir().unwrap();
        let created = FileMetaConfig::load_or_create(dir.path()).unwrap();
        assert!(dir.path().join(CONFIG_FILENAME).exists());

        let reloaded = FileMetaConfig::load(dir.path()).unwrap();
        assert_eq!(created, reloaded);
    }

    #[test]
    fn round_trips_through_json() {
        let mut config = FileMetaConfig::default();
        config.auto_sync = true;
        config.storage = StorageKind::JsonFile { path: "meta.json".to_string() };

        let dir = tempdir().unwrap();
        config.save(dir.path()).unwrap();
        let loaded = FileMetaConfig::load(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }
}
