//! Incremental schema migrations.
//!
//! The base DDL in [`super::schema`] always describes the latest shape, so a
//! fresh database needs nothing from here. Migrations only patch databases
//! created by older builds; each runs once and is recorded in
//! `schema_migrations`. No schema change has shipped since version 1, so
//! the list is empty.

use rusqlite::{Connection, Result};
use std::collections::HashSet;
use tracing::{info, warn};

/// A single migration with version identifier and SQL content.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: &'static str,
    pub sql: &'static str,
}

/// All migrations in order.
pub const MIGRATIONS: &[Migration] = &[];

/// Run every migration in `migrations` that has not been applied yet.
///
/// # Errors
///
/// Returns an error if a migration fails to apply. Duplicate-column errors
/// are logged and the migration is marked complete, since the columns are
/// already there.
pub fn run_migrations(conn: &Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in migrations {
        if applied.contains(migration.version) {
            continue;
        }

        info!(version = migration.version, "Applying migration");

        if let Err(e) = conn.execute_batch(migration.sql) {
            if e.to_string().contains("duplicate column name") {
                warn!(
                    version = migration.version,
                    "Migration partially applied (columns exist), marking complete"
                );
            } else {
                return Err(e);
            }
        }

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::{apply_schema, SCHEMA_SQL};

    const ADD_FOLDER_COLOR: Migration = Migration {
        version: "001_add_folder_color",
        sql: "ALTER TABLE folders ADD COLUMN color TEXT;",
    };

    fn migration_rows(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT version FROM schema_migrations WHERE version NOT LIKE 'v%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_fresh_database_records_no_migrations() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        assert!(migration_rows(&conn).is_empty());
    }

    #[test]
    fn test_pending_migration_applies_once() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn, &[ADD_FOLDER_COLOR]).unwrap();
        run_migrations(&conn, &[ADD_FOLDER_COLOR]).unwrap();
        assert_eq!(migration_rows(&conn), ["001_add_folder_color"]);

        conn.execute("UPDATE folders SET color = 'red' WHERE id = 'none'", [])
            .expect("color column should exist after migration");
    }

    #[test]
    fn test_existing_column_marks_migration_complete() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn.execute_batch("ALTER TABLE folders ADD COLUMN color TEXT;").unwrap();
        run_migrations(&conn, &[ADD_FOLDER_COLOR]).unwrap();
        assert_eq!(migration_rows(&conn), ["001_add_folder_color"]);
    }

    #[test]
    fn test_broken_migration_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        let broken = Migration {
            version: "002_broken",
            sql: "ALTER TABLE no_such_table ADD COLUMN x TEXT;",
        };
        assert!(run_migrations(&conn, &[broken]).is_err());
        assert!(migration_rows(&conn).is_empty());
    }
}
