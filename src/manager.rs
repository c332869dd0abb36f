//! The public façade: a struct owning its collaborators behind an owned
//! storage type parameter, with a single mutex covering every operation.

use crate::config::{FileMetaConfig, ThreadSafety};
use crate::error::{FileMetaError, Result};
use crate::fsmeta;
use crate::model::MetadataRecord;
use crate::plugin::PluginRegistry;
use crate::query;
use crate::registry::Registry;
use crate::storage::{MemoryStore, Storage};
use log::warn;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Conflict-resolution strategy for [`FileMeta::import`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStrategy {
    Replace,
    Merge,
    Skip,
}

/// Counts returned by [`FileMeta::sync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

struct State<S: Storage> {
    registry: Registry,
    storage: S,
}

/// The collaborators shared between the handle returned to callers and the
/// background auto-sync thread, if one is running.
struct Inner<S: Storage> {
    plugins: Mutex<PluginRegistry>,
    state: Mutex<State<S>>,
}

impl<S: Storage> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, State<S>> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn plugins(&self) -> MutexGuard<'_, PluginRegistry> {
        self.plugins.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Adds a file: stats it, runs plugins, assembles the three-section
    /// record, and persists to both storage and registry. Storage is
    /// written first since it can fail and the registry update cannot —
    /// that ordering means an error here never leaves the registry holding
    /// a record storage doesn't have.
    fn add(&self, path: &str, user_meta: Option<BTreeMap<String, crate::model::Value>>) -> Result<MetadataRecord> {
        let normalized = fsmeta::normalize_path(path)?;
        let system = fsmeta::get_system_metadata(&normalized)?;

        let mut record = MetadataRecord::new();
        record.system = system;
        record.user = user_meta.unwrap_or_default();

        match self.plugins().process_file(std::path::Path::new(&normalized)) {
            Ok(plugin_fields) => record.plugin = plugin_fields,
            Err(e) => warn!("plugin extraction failed for {normalized}: {e}"),
        }

        let mut state = self.lock();
        state.storage.save(&normalized, &record)?;
        state.registry.add(&normalized, record.clone());
        Ok(record)
    }

    fn get_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let normalized = fsmeta::normalize_path(path)?;
        let state = self.lock();
        state
            .registry
            .get(&normalized)
            .cloned()
            .ok_or_else(|| FileMetaError::FileAccess(format!("no metadata found for: {normalized}")))
    }

    /// Shallow-merges `patch` into `record.user`.
    fn update(&self, path: &str, patch: BTreeMap<String, crate::model::Value>) -> Result<MetadataRecord> {
        let normalized = fsmeta::normalize_path(path)?;
        let mut state = self.lock();
        let mut current = state
            .registry
            .get(&normalized)
            .cloned()
            .ok_or_else(|| FileMetaError::FileAccess(format!("no metadata found for: {normalized}")))?;

        current.user.extend(patch);
        state.storage.save(&normalized, &current)?;
        state.registry.update(&normalized, current.clone());
        Ok(current)
    }

    /// Swaps `record.user` wholesale.
    fn replace(&self, path: &str, new_user: BTreeMap<String, crate::model::Value>) -> Result<MetadataRecord> {
        let normalized = fsmeta::normalize_path(path)?;
        let mut state = self.lock();
        let mut current = state
            .registry
            .get(&normalized)
            .cloned()
            .ok_or_else(|| FileMetaError::FileAccess(format!("no metadata found for: {normalized}")))?;

        current.user = new_user;
        state.storage.save(&normalized, &current)?;
        state.registry.update(&normalized, current.clone());
        Ok(current)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let normalized = fsmeta::normalize_path(path)?;
        let mut state = self.lock();
        state.storage.delete(&normalized)?;
        state.registry.remove(&normalized);
        Ok(())
    }

    fn search(&self, query: &Json) -> Result<HashSet<String>> {
        let state = self.lock();
        query::execute(&state.registry, query)
    }

    /// Re-stats every known path, updating changed files and dropping
    /// vanished ones. `added` is always zero: sync never discovers new
    /// files.
    fn sync(&self) -> Result<SyncReport> {
        let mut state = self.lock();
        let mut report = SyncReport::default();

        for path in state.registry.all_paths() {
            if !std::path::Path::new(&path).exists() {
                state.storage.delete(&path)?;
                state.registry.remove(&path);
                report.removed += 1;
                continue;
            }

            let fresh_system = fsmeta::get_system_metadata(&path)?;
            let mut current = state
                .registry
                .get(&path)
                .cloned()
                .expect("path came from registry.all_paths()");

            let changed = current.system.get("modified") != fresh_system.get("modified");
            if changed {
                current.system = fresh_system;
                match self.plugins().process_file(std::path::Path::new(&path)) {
                    Ok(plugin_fields) => current.plugin = plugin_fields,
                    Err(e) => warn!("plugin extraction failed for {path}: {e}"),
                }
                state.storage.save(&path, &current)?;
                state.registry.update(&path, current.clone());
                report.updated += 1;
            }
        }

        Ok(report)
    }

    /// Removes every known path whose file no longer exists.
    fn cleanup_orphaned(&self) -> Result<usize> {
        let mut state = self.lock();
        let mut count = 0;
        for path in state.registry.all_paths() {
            if !std::path::Path::new(&path).exists() {
                state.storage.delete(&path)?;
                state.registry.remove(&path);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Serializes the entire primary map as JSON, keyed by path.
    fn export(&self, out_path: &str) -> Result<usize> {
        let state = self.lock();
        let mut all: BTreeMap<String, MetadataRecord> = BTreeMap::new();
        for path in state.registry.all_paths() {
            if let Some(record) = state.registry.get(&path) {
                all.insert(path, record.clone());
            }
        }
        let json = serde_json::to_string_pretty(&all).map_err(|e| FileMetaError::Storage(e.to_string()))?;
        std::fs::write(out_path, json)?;
        Ok(all.len())
    }

    /// Imports `(path, record)` entries from a JSON file previously
    /// produced by [`FileMeta::export`].
    fn import(&self, in_path: &str, strategy: ImportStrategy) -> Result<usize> {
        let raw = std::fs::read_to_string(in_path)?;
        let incoming: BTreeMap<String, MetadataRecord> =
            serde_json::from_str(&raw).map_err(|e| FileMetaError::Storage(e.to_string()))?;

        let mut state = self.lock();
        let mut count = 0;
        for (path, record) in incoming {
            if Self::import_entry(&mut state, &path, record, strategy)? {
                count += 1;
            }
        }
        Ok(count)
    }

    fn import_entry(state: &mut State<S>, path: &str, incoming: MetadataRecord, strategy: ImportStrategy) -> Result<bool> {
        let existing = state.registry.get(path).cloned();

        match (existing, strategy) {
            (Some(_), ImportStrategy::Skip) => Ok(false),
            (Some(mut current), ImportStrategy::Merge) => {
                current.user.extend(incoming.user);
                current.plugin.extend(incoming.plugin);
                state.storage.save(path, &current)?;
                state.registry.update(path, current.clone());
                Ok(true)
            }
            (Some(_), ImportStrategy::Replace) | (None, _) => {
                state.storage.save(path, &incoming)?;
                state.registry.update(path, incoming.clone());
                Ok(true)
            }
        }
    }
}

/// How often the background auto-sync thread checks its stop flag between
/// `sync_interval_secs` passes.
const AUTO_SYNC_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A running auto-sync thread. Dropping this stops and joins it.
struct AutoSyncWorker {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Drop for AutoSyncWorker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn auto_sync_loop<S: Storage>(inner: Arc<Inner<S>>, stop: Arc<AtomicBool>, interval: Duration) {
    let interval = interval.max(AUTO_SYNC_POLL_INTERVAL);
    let mut waited = Duration::ZERO;
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(AUTO_SYNC_POLL_INTERVAL);
        waited += AUTO_SYNC_POLL_INTERVAL;
        if waited < interval {
            continue;
        }
        waited = Duration::ZERO;
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if let Err(e) = inner.sync() {
            warn!("auto-sync pass failed: {e}");
        }
    }
}

/// Coordinates filesystem probing, the registry, plugins, and storage
/// behind one public API.
pub struct FileMeta<S: Storage = MemoryStore> {
    inner: Arc<Inner<S>>,
    thread_safe: ThreadSafety,
    auto_sync: Mutex<Option<AutoSyncWorker>>,
}

impl FileMeta<MemoryStore> {
    pub fn new() -> Self {
        Self::with_storage(MemoryStore::new())
    }
}

impl Default for FileMeta<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Storage> FileMeta<S> {
    /// Builds a manager over `storage`, loading any records it already
    /// holds into the registry.
    pub fn with_storage(storage: S) -> Self {
        let mut registry = Registry::new();
        if let Ok(entries) = storage.load_all() {
            for (path, record) in entries {
                registry.add(&path, record);
            }
        }
        Self {
            inner: Arc::new(Inner {
                plugins: Mutex::new(PluginRegistry::new()),
                state: Mutex::new(State { registry, storage }),
            }),
            thread_safe: ThreadSafety::Off,
            auto_sync: Mutex::new(None),
        }
    }

    pub fn with_thread_safety(mut self, thread_safe: ThreadSafety) -> Self {
        self.thread_safe = thread_safe;
        self
    }

    pub fn thread_safety(&self) -> ThreadSafety {
        self.thread_safe
    }

    pub fn register_plugin(&self, plugin: Box<dyn crate::plugin::FilePlugin>) {
        self.inner.plugins().register(plugin);
    }

    /// Adds a file: stats it, runs plugins, assembles the three-section
    /// record, and persists to both registry and storage.
    pub fn add(&self, path: &str, user_meta: Option<BTreeMap<String, crate::model::Value>>) -> Result<MetadataRecord> {
        self.inner.add(path, user_meta)
    }

    pub fn get_metadata(&self, path: &str) -> Result<MetadataRecord> {
        self.inner.get_metadata(path)
    }

    /// Shallow-merges `patch` into `record.user`.
    pub fn update(&self, path: &str, patch: BTreeMap<String, crate::model::Value>) -> Result<MetadataRecord> {
        self.inner.update(path, patch)
    }

    /// Swaps `record.user` wholesale.
    pub fn replace(&self, path: &str, new_user: BTreeMap<String, crate::model::Value>) -> Result<MetadataRecord> {
        self.inner.replace(path, new_user)
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.inner.delete(path)
    }

    pub fn search(&self, query: &Json) -> Result<HashSet<String>> {
        self.inner.search(query)
    }

    /// Re-stats every known path, updating changed files and dropping
    /// vanished ones. `added` is always zero: sync never discovers new
    /// files.
    pub fn sync(&self) -> Result<SyncReport> {
        self.inner.sync()
    }

    /// Removes every known path whose file no longer exists.
    pub fn cleanup_orphaned(&self) -> Result<usize> {
        self.inner.cleanup_orphaned()
    }

    /// Serializes the entire primary map as JSON, keyed by path.
    pub fn export(&self, out_path: &str) -> Result<usize> {
        self.inner.export(out_path)
    }

    /// Imports `(path, record)` entries from a JSON file previously
    /// produced by [`FileMeta::export`].
    pub fn import(&self, in_path: &str, strategy: ImportStrategy) -> Result<usize> {
        self.inner.import(in_path, strategy)
    }
}

impl<S: Storage + 'static> FileMeta<S> {
    /// Applies `config.auto_sync`: spawns a detached background thread that
    /// calls `sync` every `config.sync_interval_secs`, replacing any worker
    /// already running. A no-op when `config.auto_sync` is false.
    pub fn with_auto_sync(self, config: &FileMetaConfig) -> Self {
        if config.auto_sync {
            self.start_auto_sync(Duration::from_secs(config.sync_interval_secs));
        }
        self
    }

    /// Spawns a detached thread that calls `sync` every `interval` until
    /// stopped, replacing any worker already running.
    pub fn start_auto_sync(&self, interval: Duration) {
        self.stop_auto_sync();
        let stop = Arc::new(AtomicBool::new(false));
        let inner = Arc::clone(&self.inner);
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || auto_sync_loop(inner, thread_stop, interval));
        *self.auto_sync.lock().unwrap_or_else(|p| p.into_inner()) =
            Some(AutoSyncWorker { stop, handle: Some(handle) });
    }

    /// Signals the background worker to stop and joins it, if one is
    /// running.
    pub fn stop_auto_sync(&self) {
        let worker = self.auto_sync.lock().unwrap_or_else(|p| p.into_inner()).take();
        drop(worker);
    }
}
