//! Command implementations.

pub mod completions;
pub mod file;
pub mod folder;
pub mod history;
pub mod init;
pub mod project;
pub mod task;
pub mod tool;
pub mod version;

use crate::arrangement::{ArrangementPort, MemoryArrangementPort};
use crate::config::{arrangement_dir, default_actor, resolve_db_path, FileArrangementPort};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;

/// Open the resolved database, which must already exist.
pub(crate) fn open_storage(db_path: Option<&PathBuf>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path)).ok_or(Error::NotInitialized)?;
    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }
    SqliteStorage::open(&db_path)
}

/// `--actor` or the configured default.
pub(crate) fn resolve_actor(actor: Option<&str>) -> String {
    actor.map_or_else(default_actor, String::from)
}

/// The on-disk arrangement store.
pub(crate) fn arrangement_port() -> Result<FileArrangementPort> {
    arrangement_dir()
        .map(FileArrangementPort::new)
        .ok_or_else(|| Error::Config("Could not determine arrangement directory".to_string()))
}

/// In-memory copy of a saved arrangement, so a dry run can reuse the real
/// code paths without writing anything.
pub(crate) fn preview_port(port: &FileArrangementPort, key: &str) -> MemoryArrangementPort {
    let preview = MemoryArrangementPort::new();
    if let Ok(Some(saved)) = port.load(key) {
        let _ = preview.save(key, &saved);
    }
    preview
}

pub(crate) fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

/// Print a value as JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
