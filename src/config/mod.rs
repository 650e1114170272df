//! Configuration management.
//!
//! Resolves where Planroom keeps its data and who is acting:
//! - **Database**: single global database at `~/.planroom/data/planroom.db`
//! - **Arrangements**: one JSON record per project under `~/.planroom/arrangements/`
//! - **Actor**: the name written to the audit log

mod arrangement_cache;

pub use arrangement_cache::FileArrangementPort;

use std::path::{Path, PathBuf};

/// Get the global Planroom directory location (`~/.planroom/`).
#[must_use]
pub fn global_planroom_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".planroom"))
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `PLANROOM_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("PLANROOM_TEST_DB")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

/// Get the test database path (`~/.planroom/test/planroom.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_planroom_dir().map(|dir| dir.join("test").join("planroom.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `PLANROOM_TEST_DB` environment variable → uses test database
/// 3. `PLANROOM_DB` environment variable
/// 4. Global location: `~/.planroom/data/planroom.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if is_test_mode() {
        return test_db_path();
    }

    if let Ok(db_path) = std::env::var("PLANROOM_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_planroom_dir().map(|dir| dir.join("data").join("planroom.db"))
}

/// Resolve the directory holding saved folder arrangements.
///
/// `PLANROOM_ARRANGEMENT_DIR` wins; otherwise `~/.planroom/arrangements/`.
#[must_use]
pub fn arrangement_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("PLANROOM_ARRANGEMENT_DIR") {
        if !dir.trim().is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    global_planroom_dir().map(|dir| dir.join("arrangements"))
}

/// Get the default actor name.
///
/// Priority:
/// 1. `PLANROOM_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("PLANROOM_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_actor() {
        assert!(!default_actor().is_empty());
    }

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        assert_eq!(resolve_db_path(Some(&explicit)), Some(explicit));
    }

    #[test]
    fn test_test_db_path_is_separate() {
        let global = global_planroom_dir().unwrap();
        let test = test_db_path().unwrap();
        assert!(test.ends_with("test/planroom.db"));
        assert_ne!(global.join("data").join("planroom.db"), test);
    }

    #[test]
    fn test_truthy_values() {
        assert!(!is_truthy(""));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("FALSE"));
        assert!(is_truthy("1"));
        assert!(is_truthy("yes"));
    }
}
