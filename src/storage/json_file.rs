//! Single-file JSON storage backend: loaded eagerly on open, fully
//! rewritten on every mutating call.

use super::Storage;
use crate::error::{FileMetaError, Result};
use crate::model::MetadataRecord;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub struct JsonFileStore {
    file_path: PathBuf,
    data: HashMap<String, MetadataRecord>,
}

impl JsonFileStore {
    /// Opens (or prepares to create) the backing file. A missing or
    /// unparsable file starts from an empty store, matching the Python
    /// original's `except json.JSONDecodeError: self._data = {}`.
    pub fn open(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let data = if file_path.exists() {
            let raw = fs::read_to_string(&file_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };
        Ok(Self { file_path, data })
    }

    fn write_to_disk(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.data)
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;
        fs::write(&self.file_path, raw)?;
        Ok(())
    }
}

impl Storage for JsonFileStore {
    fn save(&mut self, path: &str, record: &MetadataRecord) -> Result<()> {
        self.data.insert(path.to_string(), record.clone());
        self.write_to_disk()
    }

    fn load(&self, path: &str) -> Result<Option<MetadataRecord>> {
        Ok(self.data.get(path).cloned())
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        if self.data.remove(path).is_some() {
            self.write_to_disk()?;
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, MetadataRecord)>> {
        Ok(self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
