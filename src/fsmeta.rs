//! Filesystem stat extraction feeding a record's `system` section.
//!
//! Timestamps are formatted once, locally, as `YYYY-MM-DD HH:MM:SS`, and
//! that formatted string is the canonical representation used everywhere —
//! there is no separate raw-epoch form stored anywhere.

use crate::error::{FileMetaError, Result};
use crate::model::{Fields, Value};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a [`SystemTime`] the same way on every call site (`add`, `sync`,
/// export) so later string comparisons are meaningful.
pub fn format_time(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}

/// Normalizes a path to an absolute, `.`/`..`-resolved string. Relative
/// paths resolve against the current working directory; separators are
/// left to the platform via `std::path::Path` — no case folding.
pub fn normalize_path(path: &str) -> Result<String> {
    let candidate = Path::new(path);
    let absolute: PathBuf = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(FileMetaError::from)?
            .join(candidate)
    };
    Ok(normalize_components(&absolute))
}

fn normalize_components(path: &Path) -> String {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out.to_string_lossy().into_owned()
}

/// Extracts the `system` section for a normalized path: `path`,
/// `filename`, `extension`, `size`, `created`, `modified`, `accessed`.
pub fn get_system_metadata(path: &str) -> Result<Fields> {
    let meta = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileMetaError::FileAccess(format!("file not found: {path}"))
        } else {
            FileMetaError::from(e)
        }
    })?;

    let p = Path::new(path);
    let filename = p
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = p
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let created = meta.created().unwrap_or_else(|_| meta.modified().unwrap_or(SystemTime::UNIX_EPOCH));
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let accessed = meta.accessed().unwrap_or(modified);

    let mut fields = Fields::new();
    fields.insert("path".to_string(), Value::from(path));
    fields.insert("filename".to_string(), Value::from(filename));
    fields.insert("extension".to_string(), Value::from(extension));
    fields.insert("size".to_string(), Value::Int(meta.len() as i64));
    fields.insert("created".to_string(), Value::from(format_time(created)));
    fields.insert("modified".to_string(), Value::from(format_time(modified)));
    fields.insert("accessed".to_string(), Value::from(format_time(accessed)));
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn extracts_the_seven_system_fields() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let fields = get_system_metadata(path).unwrap();
        for key in ["path", "filename", "extension", "size", "created", "modified", "accessed"] {
            assert!(fields.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn missing_file_is_file_access_error() {
        let err = get_system_metadata("/no/such/file").unwrap_err();
        assert!(matches!(err, FileMetaError::FileAccess(_)));
    }

    #[test]
    fn normalize_path_resolves_parent_dir_components() {
        let normalized = normalize_path("/a/b/../c").unwrap();
        assert_eq!(normalized, "/a/c");
    }

    #[test]
    fn normalize_path_leaves_absolute_paths_alone_otherwise() {
        let normalized = normalize_path("/already/absolute").unwrap();
        assert_eq!(normalized, "/already/absolute");
    }
}
