//! Side-car structured metadata store: an in-memory registry with a
//! primary-plus-inverted index, a MongoDB-style query engine, and a
//! manager façade that coordinates filesystem probing, plugins, and
//! pluggable storage.

pub mod config;
pub mod error;
pub mod fsmeta;
pub mod logging;
pub mod manager;
pub mod model;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod storage;

pub use config::{FileMetaConfig, StorageKind, ThreadSafety};
pub use error::{FileMetaError, Result};
pub use manager::{FileMeta, ImportStrategy, SyncReport};
pub use model::{MetadataRecord, Section, Value};
pub use plugin::{FilePlugin, PluginRegistry};
pub use query::{Clause, Operator};
pub use registry::Registry;
pub use storage::{JsonFileStore, MemoryStore, SqliteStore, Storage};
