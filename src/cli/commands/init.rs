//! Initialize the Planroom database.
//!
//! Planroom keeps one database per machine at `~/.planroom/data/planroom.db`
//! (or wherever `--db` / `PLANROOM_DB` points). Folder arrangements live
//! next to it under `~/.planroom/arrangements/`, one JSON record per
//! project.

use crate::config::{arrangement_dir, global_planroom_dir, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    arrangements: Option<PathBuf>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(PathBuf::as_path))
        .ok_or_else(|| Error::Config("Could not determine Planroom directory".to_string()))?;

    if db_path.exists() && !force {
        return Err(Error::AlreadyInitialized { path: db_path });
    }
    if force && db_path.exists() {
        fs::remove_file(&db_path)?;
    }

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Opening applies the schema.
    drop(SqliteStorage::open(&db_path)?);

    write_global_gitignore(&db_path)?;

    let arrangements = arrangement_dir();
    if let Some(dir) = &arrangements {
        if let Err(e) = fs::create_dir_all(dir) {
            warn!(dir = %dir.display(), error = %e, "Could not create arrangement directory");
        }
    }

    if json {
        let output = InitOutput {
            database: db_path,
            arrangements,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized Planroom database");
        println!("  Database: {}", db_path.display());
        if let Some(dir) = arrangements {
            println!("  Arrangements: {}", dir.display());
        }
        println!();
        println!("Next: planroom project create \"<name>\"");
    }

    Ok(())
}

/// Keep `~/.planroom/` out of git if the database lives there.
fn write_global_gitignore(db_path: &Path) -> Result<()> {
    let Some(base_dir) = global_planroom_dir() else {
        return Ok(());
    };
    if !db_path.starts_with(&base_dir) {
        return Ok(());
    }
    let gitignore_path = base_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, "# Everything in Planroom's home directory is local-only\n*\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_database_with_schema() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("nested").join("planroom.db");
        execute(Some(&db), false, true).unwrap();

        let storage = SqliteStorage::open(&db).unwrap();
        assert!(storage.list_projects(10).unwrap().is_empty());
    }

    #[test]
    fn test_init_refuses_existing_database() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("planroom.db");
        execute(Some(&db), false, true).unwrap();

        let result = execute(Some(&db), false, true);
        assert!(matches!(result, Err(Error::AlreadyInitialized { .. })));
        assert!(execute(Some(&db), true, true).is_ok());
    }
}
