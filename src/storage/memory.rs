//! In-memory storage backend: a plain map, nothing persisted across
//! process restarts.

use super::Storage;
use crate::error::Result;
use crate::model::MetadataRecord;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: HashMap<String, MetadataRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn save(&mut self, path: &str, record: &MetadataRecord) -> Result<()> {
        self.data.insert(path.to_string(), record.clone());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Option<MetadataRecord>> {
        Ok(self.data.get(path).cloned())
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.data.remove(path);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, MetadataRecord)>> {
        Ok(self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_record() {
        let mut store = MemoryStore::new();
        let rec = MetadataRecord::new();
        store.save("a.txt", &rec).unwrap();
        assert!(store.load("a.txt").unwrap().is_some());
        store.delete("a.txt").unwrap();
        assert!(store.load("a.txt").unwrap().is_none());
    }
}
