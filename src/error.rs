use std::fmt;
use std::io;

/// Error kinds surfaced by the public API.
///
/// `Plugin` failures are caught and logged by the manager rather than
/// propagated — see [`crate::manager::FileMeta::add`] — so callers normally
/// only see the other three variants.
#[derive(Debug, Clone)]
pub enum FileMetaError {
    /// Target path absent, unreadable, or not registered when the
    /// operation requires an existing record.
    FileAccess(String),
    /// An extractor raised, or all extractors failed.
    Plugin(String),
    /// Persistence layer failure.
    Storage(String),
    /// Query is structurally malformed.
    Query(String),
}

impl fmt::Display for FileMetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileMetaError::FileAccess(msg) => write!(f, "file access error: {msg}"),
            FileMetaError::Plugin(msg) => write!(f, "plugin error: {msg}"),
            FileMetaError::Storage(msg) => write!(f, "storage error: {msg}"),
            FileMetaError::Query(msg) => write!(f, "query error: {msg}"),
        }
    }
}

impl std::error::Error for FileMetaError {}

impl From<io::Error> for FileMetaError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                FileMetaError::FileAccess(err.to_string())
            }
            _ => FileMetaError::Storage(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for FileMetaError {
    fn from(err: serde_json::Error) -> Self {
        FileMetaError::Storage(format!("JSON error: {err}"))
    }
}

impl From<rusqlite::Error> for FileMetaError {
    fn from(err: rusqlite::Error) -> Self {
        FileMetaError::Storage(format!("sqlite error: {err}"))
    }
}

impl From<FileMetaError> for io::Error {
    fn from(err: FileMetaError) -> Self {
        match err {
            FileMetaError::FileAccess(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            FileMetaError::Plugin(msg) => io::Error::other(msg),
            FileMetaError::Storage(msg) => io::Error::other(msg),
            FileMetaError::Query(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
        }
    }
}

/// Result type alias for filemeta operations.
pub type Result<T> = std::result::Result<T, FileMetaError>;

/// Attaches operation/path context to an error message.
///
/// A small builder rather than ad-hoc `format!` calls at each error site,
/// so "operation + optional path" stays a consistent shape.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    operation: String,
    path: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn build(self, error: FileMetaError) -> FileMetaError {
        let message = match &self.path {
            Some(path) => format!("{}: {} (path: {})", self.operation, error, path),
            None => format!("{}: {}", self.operation, error),
        };

        match error {
            FileMetaError::FileAccess(_) => FileMetaError::FileAccess(message),
            FileMetaError::Plugin(_) => FileMetaError::Plugin(message),
            FileMetaError::Storage(_) => FileMetaError::Storage(message),
            FileMetaError::Query(_) => FileMetaError::Query(message),
        }
    }
}
