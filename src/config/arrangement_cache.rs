//! File-backed arrangement store.
//!
//! One JSON file per project key under the arrangement directory, holding
//! `{"version": 1, "order": [...], "separatorIndex": n}`. Writes go to a
//! temp file and are renamed into place so a concurrent reader never sees
//! half a record.

use crate::arrangement::{Arrangement, ArrangementPort};
use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// [`ArrangementPort`] that keeps each record in its own file.
#[derive(Debug, Clone)]
pub struct FileArrangementPort {
    dir: PathBuf,
}

impl FileArrangementPort {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`.
    ///
    /// # Errors
    ///
    /// Returns a config error if the key sanitizes to nothing.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let name = sanitize_key(key)
            .ok_or_else(|| Error::Config(format!("invalid arrangement key: {key:?}")))?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Remove the record for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl ArrangementPort for FileArrangementPort {
    fn load(&self, key: &str) -> Result<Option<Arrangement>> {
        let path = self.path_for(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, key: &str, arrangement: &Arrangement) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let file_path = self.path_for(key)?;
        let temp_path = file_path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(arrangement)?;

        {
            let mut opts = fs::OpenOptions::new();
            opts.write(true).create(true).truncate(true);
            #[cfg(unix)]
            opts.mode(0o600);
            let mut file = opts.open(&temp_path)?;
            file.write_all(json.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, &file_path)?;
        Ok(())
    }
}

/// Sanitize a key for use as a filename.
fn sanitize_key(key: &str) -> Option<String> {
    let sanitized: String = key
        .trim()
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .take(120)
        .collect();

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}
