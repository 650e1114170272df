//! Folder and file models.
//!
//! Folders group a project's files. Their ids are stable across fetches;
//! titles are mutable. The remote list is ordered by creation, never by the
//! user's manual arrangement (that lives in [`crate::arrangement`]).

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A user-visible grouping of files within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub project_id: String,
    pub title: String,
    /// Last index written by a drag reorder. Informational only.
    pub sort_order: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Folder {
    /// Create a new folder record with a fresh id.
    #[must_use]
    pub fn new(project_id: &str, title: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            sort_order: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A single uploaded document (or AI-written note) inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    pub project_id: String,
    /// Owning folder. A file belongs to exactly one folder at a time.
    pub folder_id: String,
    pub name: String,
    /// Where the uploaded bytes came from, if this is an upload.
    pub storage_path: Option<String>,
    pub mimetype: Option<String>,
    pub size: Option<i64>,
    /// SHA-256 of the uploaded bytes (hex).
    pub checksum: Option<String>,
    /// Inline body for notes written through the tool dispatcher.
    pub content: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProjectFile {
    /// Create a new file record with a fresh id and no payload metadata.
    #[must_use]
    pub fn new(project_id: &str, folder_id: &str, name: &str) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            folder_id: folder_id.to_string(),
            name: name.to_string(),
            storage_path: None,
            mimetype: None,
            size: None,
            checksum: None,
            content: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Guess a mimetype from the file extension.
    #[must_use]
    pub fn guess_mimetype(name: &str) -> Option<&'static str> {
        let ext = std::path::Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        let mime = match ext.as_str() {
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "dwg" => "image/vnd.dwg",
            "md" => "text/markdown",
            "txt" => "text/plain",
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            _ => return None,
        };
        Some(mime)
    }

    /// Attach an inline text body, filling size, checksum and mimetype.
    #[must_use]
    pub fn with_content(mut self, content: String) -> Self {
        self.size = i64::try_from(content.len()).ok();
        self.checksum = Some(content_checksum(content.as_bytes()));
        if self.mimetype.is_none() {
            self.mimetype = Self::guess_mimetype(&self.name).map(str::to_string);
        }
        self.content = Some(content);
        self
    }
}

/// SHA-256 of a file's bytes as lowercase hex.
#[must_use]
pub fn content_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mimetype() {
        assert_eq!(ProjectFile::guess_mimetype("A-101.PDF"), Some("application/pdf"));
        assert_eq!(ProjectFile::guess_mimetype("site.jpeg"), Some("image/jpeg"));
        assert_eq!(ProjectFile::guess_mimetype("README"), None);
    }

    #[test]
    fn test_checksum_is_sha256_hex() {
        assert_eq!(
            content_checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_with_content_fills_metadata() {
        let note = ProjectFile::new("p", "f", "minutes.md").with_content("# Site walk".to_string());
        assert_eq!(note.size, Some(11));
        assert_eq!(note.mimetype.as_deref(), Some("text/markdown"));
        assert_eq!(note.checksum.as_deref().map(str::len), Some(64));
    }

    #[test]
    fn test_new_file_belongs_to_folder() {
        let file = ProjectFile::new("p", "f", "plan.pdf");
        assert_eq!(file.folder_id, "f");
        assert!(file.content.is_none());
    }
}
