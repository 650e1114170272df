//! The remote store as seen by the explorer panel.
//!
//! [`ProjectRemote`] is the narrow surface the explorer needs: list a
//! project's folders and files in creation order, and apply single-row
//! mutations. [`StorageRemote`] binds it to [`SqliteStorage`] with a fixed
//! actor so every call lands in the audit log.

use crate::error::Result;
use crate::model::{Folder, ProjectFile};
use crate::storage::SqliteStorage;

/// Remote folder/file operations for one project panel.
pub trait ProjectRemote {
    /// Folders in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be read.
    fn fetch_folders(&self, project_id: &str) -> Result<Vec<Folder>>;

    /// Files in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote cannot be read.
    fn fetch_files(&self, project_id: &str) -> Result<Vec<ProjectFile>>;

    /// Create a folder and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote rejects the insert.
    fn create_folder(&mut self, project_id: &str, title: &str) -> Result<Folder>;

    /// # Errors
    ///
    /// Returns an error if the folder is missing or the update fails.
    fn rename_folder(&mut self, folder_id: &str, title: &str) -> Result<()>;

    /// Delete a folder and its files.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder is missing or the delete fails.
    fn delete_folder(&mut self, folder_id: &str) -> Result<()>;

    /// Best-effort record of a folder's new display index.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder is missing or the update fails.
    fn reorder_folder(&mut self, folder_id: &str, index: usize) -> Result<()>;

    /// Reassign a file to another folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or folder is missing.
    fn move_file(&mut self, file_id: &str, folder_id: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the file is missing or the update fails.
    fn rename_file(&mut self, file_id: &str, name: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if the file is missing or the delete fails.
    fn delete_file(&mut self, file_id: &str) -> Result<()>;
}

/// [`SqliteStorage`] acting as the remote for a given actor.
pub struct StorageRemote<'a> {
    storage: &'a mut SqliteStorage,
    actor: String,
}

impl SqliteStorage {
    /// Borrow this storage as a [`ProjectRemote`] that audits as `actor`.
    pub fn remote(&mut self, actor: &str) -> StorageRemote<'_> {
        StorageRemote {
            storage: self,
            actor: actor.to_string(),
        }
    }
}

impl StorageRemote<'_> {
    #[must_use]
    pub fn storage(&self) -> &SqliteStorage {
        self.storage
    }
}

impl ProjectRemote for StorageRemote<'_> {
    fn fetch_folders(&self, project_id: &str) -> Result<Vec<Folder>> {
        self.storage.list_folders(project_id)
    }

    fn fetch_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        self.storage.list_files(project_id)
    }

    fn create_folder(&mut self, project_id: &str, title: &str) -> Result<Folder> {
        self.storage.create_folder(project_id, title, &self.actor)
    }

    fn rename_folder(&mut self, folder_id: &str, title: &str) -> Result<()> {
        self.storage.rename_folder(folder_id, title, &self.actor).map(|_| ())
    }

    fn delete_folder(&mut self, folder_id: &str) -> Result<()> {
        self.storage.delete_folder(folder_id, &self.actor).map(|_| ())
    }

    fn reorder_folder(&mut self, folder_id: &str, index: usize) -> Result<()> {
        self.storage.reorder_folder(folder_id, index, &self.actor)
    }

    fn move_file(&mut self, file_id: &str, folder_id: &str) -> Result<()> {
        self.storage.move_file(file_id, folder_id, &self.actor)
    }

    fn rename_file(&mut self, file_id: &str, name: &str) -> Result<()> {
        self.storage.rename_file(file_id, name, &self.actor)
    }

    fn delete_file(&mut self, file_id: &str) -> Result<()> {
        self.storage.delete_file(file_id, &self.actor)
    }
}
