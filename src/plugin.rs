//! File-type plugin interface and dispatcher.
//!
//! Plugins are tried in descending-priority order and their extracted
//! fields are folded left-to-right, so a later (lower-priority) plugin's
//! fields win a key collision against an earlier (higher-priority) one —
//! counterintuitive, but it keeps the fold a single pass with no
//! special-casing for which writer "should" win.

use crate::error::{FileMetaError, Result};
use crate::model::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

/// A file-type metadata extractor.
///
/// Implementors decide which files they handle (`supports`) and extract
/// a flat field map from a matched file (`extract`). Both are read-only
/// with respect to the registry — plugins never see or mutate it.
pub trait FilePlugin: Send + Sync {
    fn supports(&self, path: &Path) -> bool;

    fn extract(&self, path: &Path) -> Result<BTreeMap<String, Value>>;

    /// Higher runs first. Ties keep registration order (stable sort).
    fn priority(&self) -> i32 {
        0
    }
}

/// Dispatches a file to every supporting plugin and merges their output.
pub struct PluginRegistry {
    plugins: Vec<Box<dyn FilePlugin>>,
    max_workers: usize,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::with_max_workers(4)
    }

    pub fn with_max_workers(max_workers: usize) -> Self {
        Self { plugins: Vec::new(), max_workers: max_workers.max(1) }
    }

    /// Registers a plugin and re-sorts by descending priority, stable on
    /// ties (registration order is the tie-break).
    pub fn register(&mut self, plugin: Box<dyn FilePlugin>) {
        self.plugins.push(plugin);
        self.plugins.sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Runs every supporting plugin against `path`, folding their fields
    /// left-to-right in priority order (later write wins). Returns an
    /// empty map when no plugin supports the file. Fails only when at
    /// least one plugin attempted extraction and *all* attempts failed.
    pub fn process_file(&self, path: &Path) -> Result<BTreeMap<String, Value>> {
        if !path.exists() {
            return Err(FileMetaError::FileAccess(format!(
                "file not found: {}",
                path.display()
            )));
        }

        let supporting: Vec<&Box<dyn FilePlugin>> =
            self.plugins.iter().filter(|p| p.supports(path)).collect();

        if supporting.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut results = BTreeMap::new();
        let mut errors = Vec::new();

        for plugin in supporting {
            match plugin.extract(path) {
                Ok(fields) => results.extend(fields),
                Err(e) => errors.push(e.to_string()),
            }
        }

        if !errors.is_empty() && results.is_empty() {
            return Err(FileMetaError::Plugin(format!(
                "all plugins failed: {}",
                errors.join("; ")
            )));
        }

        Ok(results)
    }

    /// Processes many files concurrently on a bounded worker pool. Results
    /// come back in the same order as `paths`; a per-file failure is
    /// reported inline rather than aborting the batch.
    pub fn process_files(&self, paths: &[std::path::PathBuf]) -> Vec<Result<BTreeMap<String, Value>>> {
        if paths.is_empty() {
            return Vec::new();
        }

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            let chunk_size = paths.len().div_ceil(self.max_workers).max(1);

            for (worker_index, chunk) in paths.chunks(chunk_size).enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    for (offset, path) in chunk.iter().enumerate() {
                        let result = self.process_file(path);
                        tx.send((worker_index * chunk_size + offset, result)).ok();
                    }
                });
            }
            drop(tx);

            let mut ordered: Vec<Option<Result<BTreeMap<String, Value>>>> =
                (0..paths.len()).map(|_| None).collect();
            for (index, result) in rx {
                ordered[index] = Some(result);
            }
            ordered.into_iter().map(|r| r.expect("every index produced by a worker")).collect()
        })
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
