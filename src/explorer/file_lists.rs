//! Per-folder file lists.
//!
//! The remote store returns one flat file list per project. The panel
//! groups it by folder id, keeping remote order inside each group, and then
//! mutates the groups locally as files are dragged around.

use crate::error::{Error, Result};
use crate::model::ProjectFile;
use serde::Serialize;
use std::collections::HashMap;

/// Which half of the target row the cursor was over on drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPosition {
    /// Insert before the target row.
    #[default]
    Above,
    /// Insert after the target row.
    Below,
}

impl DropPosition {
    /// Above if the cursor is above the row's vertical midpoint.
    #[must_use]
    pub fn from_cursor(cursor_y: f64, row_top: f64, row_height: f64) -> Self {
        if cursor_y < row_top + row_height / 2.0 {
            Self::Above
        } else {
            Self::Below
        }
    }

    /// Insertion index relative to the target row at `index`.
    #[must_use]
    pub const fn insert_index(self, index: usize) -> usize {
        match self {
            Self::Above => index,
            Self::Below => index.saturating_add(1),
        }
    }
}

/// Where a file sits: its folder and row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub folder_id: String,
    pub index: usize,
}

/// Files grouped by folder id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileLists {
    by_folder: HashMap<String, Vec<ProjectFile>>,
}

impl FileLists {
    /// Group a flat remote list by folder, preserving order within each folder.
    #[must_use]
    pub fn group(files: impl IntoIterator<Item = ProjectFile>) -> Self {
        let mut by_folder: HashMap<String, Vec<ProjectFile>> = HashMap::new();
        for file in files {
            by_folder.entry(file.folder_id.clone()).or_default().push(file);
        }
        Self { by_folder }
    }

    /// Files in a folder, in display order.
    #[must_use]
    pub fn files(&self, folder_id: &str) -> &[ProjectFile] {
        self.by_folder.get(folder_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Total number of files across all folders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_folder.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current folder and index of a file.
    #[must_use]
    pub fn locate(&self, file_id: &str) -> Option<Placement> {
        self.by_folder.iter().find_map(|(folder_id, files)| {
            files.iter().position(|f| f.id == file_id).map(|index| Placement {
                folder_id: folder_id.clone(),
                index,
            })
        })
    }

    #[must_use]
    pub fn get(&self, file_id: &str) -> Option<&ProjectFile> {
        self.by_folder
            .values()
            .flat_map(|files| files.iter())
            .find(|f| f.id == file_id)
    }

    /// Drop every file of a folder, returning them.
    pub fn remove_folder(&mut self, folder_id: &str) -> Vec<ProjectFile> {
        self.by_folder.remove(folder_id).unwrap_or_default()
    }

    /// Remove a file, returning it with its former placement.
    pub fn remove_file(&mut self, file_id: &str) -> Option<(ProjectFile, Placement)> {
        let placement = self.locate(file_id)?;
        let list = self.by_folder.get_mut(&placement.folder_id)?;
        let file = list.remove(placement.index);
        Some((file, placement))
    }

    /// Insert a file into a folder at `index` (clamped), reassigning it.
    pub fn insert_file(&mut self, folder_id: &str, index: usize, mut file: ProjectFile) -> usize {
        file.folder_id = folder_id.to_string();
        let list = self.by_folder.entry(folder_id.to_string()).or_default();
        let at = index.min(list.len());
        list.insert(at, file);
        at
    }

    /// Move a file next to the row at `index` in `to_folder`.
    ///
    /// The insertion index is `index` above the row or `index + 1` below it,
    /// computed against the target list after the file left its source, and
    /// clamped to the list length. Returns the final index.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file is not in `from_folder`.
    pub fn move_file(
        &mut self,
        file_id: &str,
        from_folder: &str,
        to_folder: &str,
        index: usize,
        position: DropPosition,
    ) -> Result<usize> {
        let source = self
            .by_folder
            .get_mut(from_folder)
            .ok_or_else(|| Error::FileNotFound { id: file_id.to_string() })?;
        let at = source
            .iter()
            .position(|f| f.id == file_id)
            .ok_or_else(|| Error::FileNotFound { id: file_id.to_string() })?;
        let file = source.remove(at);

        Ok(self.insert_file(to_folder, position.insert_index(index), file))
    }

    /// Rename a file in place, returning its previous name.
    pub fn rename_file(&mut self, file_id: &str, name: &str) -> Option<String> {
        self.by_folder
            .values_mut()
            .flat_map(|files| files.iter_mut())
            .find(|f| f.id == file_id)
            .map(|f| std::mem::replace(&mut f.name, name.to_string()))
    }

    /// Files whose name contains `query`, case-insensitively.
    #[must_use]
    pub fn matching<'a>(&'a self, folder_id: &str, query: &str) -> Vec<&'a ProjectFile> {
        let needle = query.trim().to_lowercase();
        self.files(folder_id)
            .iter()
            .filter(|f| needle.is_empty() || f.name.to_lowercase().contains(&needle))
            .collect()
    }
}
