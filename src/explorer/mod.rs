//! Project explorer panel model.
//!
//! [`ProjectExplorer`] is everything the file panel needs between renders:
//! the remote folders and files, the persisted arrangement, and per-row UI
//! state. Rendering is left to the caller; [`ProjectExplorer::sections`]
//! hands back the two partitions ready to draw.
//!
//! # Submodules
//!
//! - [`file_lists`] - Per-folder file lists and file drag-and-drop
//! - [`row`] - Per-row expand/rename/drag state
//! - [`command`] - Optimistic local change + remote call + revert

pub mod command;
pub mod file_lists;
pub mod row;

pub use command::{
    run_optimistic, MoveFileCommand, OptimisticCommand, RemoteSync, RenameFileCommand, RenameFolderCommand,
    ReorderFolderCommand, RevertPolicy,
};
pub use file_lists::{DropPosition, FileLists, Placement};
pub use row::{Expansion, FolderRow, RowState};

use crate::arrangement::{arrangement_key, Arrangement, ArrangementPort, ArrangementStore};
use crate::error::{Error, Result};
use crate::model::{Folder, ProjectFile};
use crate::storage::ProjectRemote;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

const NEW_FOLDER_TITLE: &str = "New Folder";

/// First unused "New Folder", "New Folder (1)", "New Folder (2)", … title.
#[must_use]
pub fn next_new_folder_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let used: HashSet<&str> = existing.into_iter().collect();
    if !used.contains(NEW_FOLDER_TITLE) {
        return NEW_FOLDER_TITLE.to_string();
    }
    (1..)
        .map(|n| format!("{NEW_FOLDER_TITLE} ({n})"))
        .find(|title| !used.contains(title.as_str()))
        .unwrap_or_default()
}

/// One folder row as it should be drawn.
#[derive(Debug, Clone, Serialize)]
pub struct FolderView<'a> {
    pub folder: &'a Folder,
    pub expanded: bool,
    #[serde(skip)]
    pub state: &'a RowState,
    pub files: Vec<&'a ProjectFile>,
}

/// The two partitions around the separator line.
#[derive(Debug, Clone, Serialize)]
pub struct Sections<'a> {
    pub above: Vec<FolderView<'a>>,
    pub below: Vec<FolderView<'a>>,
    /// `false` for a project without folders.
    pub show_separator: bool,
}

impl Sections<'_> {
    #[must_use]
    pub fn folder_count(&self) -> usize {
        self.above.len() + self.below.len()
    }
}

/// Live model of one project's file panel.
pub struct ProjectExplorer<P: ArrangementPort> {
    project_id: String,
    folders: Vec<Folder>,
    files: FileLists,
    store: ArrangementStore<P>,
    rows: HashMap<String, FolderRow>,
    policy: RevertPolicy,
}

impl<P: ArrangementPort> ProjectExplorer<P> {
    /// Fetch folders and files and open the arrangement for `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote fetch fails. Arrangement store failures
    /// are logged and never fail the load.
    pub fn load(project_id: &str, remote: &dyn ProjectRemote, port: P) -> Result<Self> {
        let folders = remote.fetch_folders(project_id)?;
        let files = FileLists::group(remote.fetch_files(project_id)?);
        let store = ArrangementStore::open(arrangement_key(project_id), port, &folders);
        let rows = folders.iter().map(|f| (f.id.clone(), FolderRow::new())).collect();

        debug!(project = project_id, folders = folders.len(), files = files.len(), "Loaded explorer");
        Ok(Self {
            project_id: project_id.to_string(),
            folders,
            files,
            store,
            rows,
            policy: RevertPolicy::default(),
        })
    }

    /// Set how remote failures treat optimistic changes.
    #[must_use]
    pub fn with_revert_policy(mut self, policy: RevertPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Folders in remote (creation) order.
    #[must_use]
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    #[must_use]
    pub fn folder(&self, folder_id: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.id == folder_id)
    }

    #[must_use]
    pub fn files(&self) -> &FileLists {
        &self.files
    }

    #[must_use]
    pub fn arrangement(&self) -> &Arrangement {
        self.store.arrangement()
    }

    #[must_use]
    pub fn store(&self) -> &ArrangementStore<P> {
        &self.store
    }

    #[must_use]
    pub fn row(&self, folder_id: &str) -> Option<&FolderRow> {
        self.rows.get(folder_id)
    }

    /// Above/below partitions in display order.
    ///
    /// A non-empty `query` keeps only files whose name contains it, hides
    /// folders left without matches, and shows every remaining folder open.
    #[must_use]
    pub fn sections(&self, query: &str) -> Sections<'_> {
        let searching = !query.trim().is_empty();
        let arrangement = self.store.arrangement();
        Sections {
            above: self.folder_views(arrangement.above(), query, searching),
            below: self.folder_views(arrangement.below(), query, searching),
            show_separator: arrangement.separator().is_some(),
        }
    }

    fn folder_views(&self, ids: &[String], query: &str, searching: bool) -> Vec<FolderView<'_>> {
        ids.iter()
            .filter_map(|id| {
                let folder = self.folder(id)?;
                let row = self.rows.get(id)?;
                let files = self.files.matching(id, query);
                if searching && files.is_empty() {
                    return None;
                }
                Some(FolderView {
                    folder,
                    expanded: searching || row.is_expanded(),
                    state: &row.state,
                    files,
                })
            })
            .collect()
    }

    fn row_mut(&mut self, folder_id: &str) -> Result<&mut FolderRow> {
        self.rows
            .get_mut(folder_id)
            .ok_or_else(|| Error::FolderNotFound { id: folder_id.to_string() })
    }

    fn require_folder(&self, folder_id: &str) -> Result<&Folder> {
        self.folder(folder_id)
            .ok_or_else(|| Error::FolderNotFound { id: folder_id.to_string() })
    }

    /// Expand or collapse a folder.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn toggle(&mut self, folder_id: &str) -> Result<Expansion> {
        Ok(self.row_mut(folder_id)?.toggle())
    }

    // ── Folder drag ───────────────────────────────────────────

    /// Drop a folder at `target_index` and record it remotely (best effort).
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder is not arranged.
    pub fn move_folder(
        &mut self,
        folder_id: &str,
        target_index: usize,
        remote: &mut dyn ProjectRemote,
    ) -> Result<RemoteSync> {
        let policy = self.policy;
        self.row_mut(folder_id)?.begin_drag();
        let mut command = ReorderFolderCommand::new(folder_id, target_index);
        let result = run_optimistic(&mut command, &mut self.store, remote, policy);
        self.row_mut(folder_id)?.end_drag();
        result
    }

    pub fn begin_separator_drag(&mut self) {
        self.store.begin_separator_drag();
    }

    pub fn drag_separator(&mut self, new_index: i64) -> &Arrangement {
        self.store.drag_separator(new_index)
    }

    pub fn release_separator(&mut self) -> &Arrangement {
        self.store.release_separator()
    }

    /// Move the separator and persist in one step.
    pub fn move_separator(&mut self, new_index: i64) -> &Arrangement {
        self.store.move_separator(new_index)
    }

    /// Discard the manual arrangement.
    pub fn reset_arrangement(&mut self) -> &Arrangement {
        self.store.reset(&self.folders)
    }

    // ── File drag ─────────────────────────────────────────────

    /// Drop a file on the row at `index` of `to_folder`.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` or `FolderNotFound` if either end is unknown.
    pub fn move_file(
        &mut self,
        file_id: &str,
        to_folder: &str,
        index: usize,
        position: DropPosition,
        remote: &mut dyn ProjectRemote,
    ) -> Result<RemoteSync> {
        self.require_folder(to_folder)?;
        let from = self
            .files
            .locate(file_id)
            .ok_or_else(|| Error::FileNotFound { id: file_id.to_string() })?;

        let mut command = MoveFileCommand::new(file_id, &from.folder_id, to_folder, index, position);
        run_optimistic(&mut command, &mut self.files, remote, self.policy)
    }

    // ── Folder lifecycle ──────────────────────────────────────

    /// Create a folder and open it for renaming.
    ///
    /// Without a title the first free "New Folder" name is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote rejects the folder.
    pub fn create_folder(&mut self, title: Option<&str>, remote: &mut dyn ProjectRemote) -> Result<Folder> {
        let title = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => next_new_folder_name(self.folders.iter().map(|f| f.title.as_str())),
        };

        let folder = remote.create_folder(&self.project_id, &title)?;
        info!(project = %self.project_id, folder = %folder.id, title = %folder.title, "Created folder");

        let mut row = FolderRow::new();
        row.begin_rename(&folder.title);
        self.rows.insert(folder.id.clone(), row);
        self.folders.push(folder.clone());
        self.store.refresh(&self.folders);
        Ok(folder)
    }

    /// Enter rename mode for a folder.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn begin_rename(&mut self, folder_id: &str) -> Result<()> {
        let title = self.require_folder(folder_id)?.title.clone();
        self.row_mut(folder_id)?.begin_rename(&title);
        Ok(())
    }

    /// Replace the draft title of a folder being renamed.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn edit_rename(&mut self, folder_id: &str, text: &str) -> Result<()> {
        self.row_mut(folder_id)?.edit_draft(text);
        Ok(())
    }

    /// Escape: leave rename mode with the title unchanged.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn cancel_rename(&mut self, folder_id: &str) -> Result<()> {
        self.row_mut(folder_id)?.cancel_rename();
        Ok(())
    }

    /// Enter: save the draft title if it is non-empty and changed.
    ///
    /// Returns `None` when there was nothing to save.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn commit_rename(&mut self, folder_id: &str, remote: &mut dyn ProjectRemote) -> Result<Option<RemoteSync>> {
        let current = self.require_folder(folder_id)?.title.clone();
        let Some(title) = self.row_mut(folder_id)?.commit_rename(&current) else {
            return Ok(None);
        };

        let mut command = RenameFolderCommand::new(folder_id, &title);
        run_optimistic(&mut command, &mut self.folders, remote, self.policy).map(Some)
    }

    /// Rename a folder in one step.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder.
    pub fn rename_folder(
        &mut self,
        folder_id: &str,
        title: &str,
        remote: &mut dyn ProjectRemote,
    ) -> Result<Option<RemoteSync>> {
        self.begin_rename(folder_id)?;
        self.edit_rename(folder_id, title)?;
        self.commit_rename(folder_id, remote)
    }

    /// Delete a folder and its files, remote first.
    ///
    /// Returns the number of files that went with it.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` for an unknown folder, or the remote error,
    /// in which case nothing changes locally.
    pub fn delete_folder(&mut self, folder_id: &str, remote: &mut dyn ProjectRemote) -> Result<usize> {
        self.require_folder(folder_id)?;
        remote.delete_folder(folder_id)?;

        self.folders.retain(|f| f.id != folder_id);
        self.rows.remove(folder_id);
        let removed = self.files.remove_folder(folder_id).len();
        self.store.refresh(&self.folders);
        info!(project = %self.project_id, folder = folder_id, files = removed, "Deleted folder");
        Ok(removed)
    }

    // ── File lifecycle ────────────────────────────────────────

    /// Rename a file.
    ///
    /// # Errors
    ///
    /// Returns `RequiredField` for a blank name or `FileNotFound`.
    pub fn rename_file(&mut self, file_id: &str, name: &str, remote: &mut dyn ProjectRemote) -> Result<RemoteSync> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::RequiredField("name".to_string()));
        }
        let mut command = RenameFileCommand::new(file_id, name);
        run_optimistic(&mut command, &mut self.files, remote, self.policy)
    }

    /// Delete a file, remote first.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` or the remote error.
    pub fn delete_file(&mut self, file_id: &str, remote: &mut dyn ProjectRemote) -> Result<ProjectFile> {
        if self.files.get(file_id).is_none() {
            return Err(Error::FileNotFound { id: file_id.to_string() });
        }
        remote.delete_file(file_id)?;
        self.files
            .remove_file(file_id)
            .map(|(file, _)| file)
            .ok_or_else(|| Error::FileNotFound { id: file_id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::command::tests::FakeRemote;
    use super::*;
    use crate::arrangement::{MemoryArrangementPort, DEFAULT_SEPARATOR};
    use crate::model::Project;
    use crate::storage::SqliteStorage;

    fn seeded() -> (SqliteStorage, Project) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("Oak Street".to_string());
        storage.create_project(&project, "test").unwrap();
        (storage, project)
    }

    fn folder_id(explorer: &ProjectExplorer<&MemoryArrangementPort>, title: &str) -> String {
        explorer
            .folders()
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.id.clone())
            .unwrap()
    }

    fn titles(views: &[FolderView<'_>]) -> Vec<String> {
        views.iter().map(|v| v.folder.title.clone()).collect()
    }

    #[test]
    fn test_next_new_folder_name() {
        assert_eq!(next_new_folder_name(["Plans"]), "New Folder");
        assert_eq!(next_new_folder_name(["New Folder"]), "New Folder (1)");
        assert_eq!(
            next_new_folder_name(["New Folder", "New Folder (1)", "New Folder (3)"]),
            "New Folder (2)"
        );
    }

    #[test]
    fn test_load_partitions_canonical_folders() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();

        let sections = explorer.sections("");
        assert_eq!(titles(&sections.above), ["Pre-Design", "Design", "Permit", "Build"]);
        assert_eq!(titles(&sections.below), ["Plans", "Photos", "Attachments"]);
        assert!(sections.show_separator);
        assert!(sections.above.iter().all(|v| v.expanded));
        assert_eq!(explorer.arrangement().separator_index, DEFAULT_SEPARATOR);
    }

    #[test]
    fn test_move_folder_across_separator_persists_and_audits() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let photos = folder_id(&explorer, "Photos");

        let sync = explorer.move_folder(&photos, 0, &mut storage.remote("dana")).unwrap();
        assert_eq!(sync, RemoteSync::Confirmed);
        assert_eq!(explorer.arrangement().separator_index, DEFAULT_SEPARATOR + 1);
        assert_eq!(explorer.row(&photos).unwrap().state, RowState::Viewing);

        let reopened = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        assert_eq!(reopened.arrangement().order[0], photos);
        assert_eq!(storage.get_events("folder", &photos, None).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_reorder_keeps_local_order() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let plans = folder_id(&explorer, "Plans");

        let mut offline = FakeRemote {
            fail: true,
            ..FakeRemote::default()
        };
        let sync = explorer.move_folder(&plans, 0, &mut offline).unwrap();
        assert!(sync.is_failed());
        assert_eq!(explorer.arrangement().order[0], plans);
    }

    #[test]
    fn test_move_file_between_folders() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let plans = folder_id(&explorer, "Plans");
        let build = folder_id(&explorer, "Build");
        let file = ProjectFile::new(&project.id, &plans, "site-plan.pdf");
        storage.add_file(&file, "test").unwrap();

        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let sync = explorer
            .move_file(&file.id, &build, 0, DropPosition::Below, &mut storage.remote("dana"))
            .unwrap();
        assert_eq!(sync, RemoteSync::Confirmed);
        assert_eq!(explorer.files().files(&build)[0].id, file.id);
        assert_eq!(storage.get_file(&file.id).unwrap().unwrap().folder_id, build);
    }

    #[test]
    fn test_search_filters_and_opens_folders() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let photos = folder_id(&explorer, "Photos");
        storage
            .add_file(&ProjectFile::new(&project.id, &photos, "Framing-North.jpg"), "test")
            .unwrap();
        storage
            .add_file(&ProjectFile::new(&project.id, &photos, "roof.jpg"), "test")
            .unwrap();

        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        explorer.toggle(&photos).unwrap();
        assert!(!explorer.sections("").below[1].expanded);

        let found = explorer.sections("framing");
        assert!(found.above.is_empty());
        assert_eq!(titles(&found.below), ["Photos"]);
        assert!(found.below[0].expanded);
        assert_eq!(found.below[0].files.len(), 1);
    }

    #[test]
    fn test_create_folder_disambiguates_and_appends() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();

        let first = explorer.create_folder(None, &mut storage.remote("dana")).unwrap();
        let second = explorer.create_folder(None, &mut storage.remote("dana")).unwrap();
        assert_eq!(first.title, "New Folder");
        assert_eq!(second.title, "New Folder (1)");
        assert!(matches!(explorer.row(&second.id).unwrap().state, RowState::Editing { .. }));
        assert_eq!(explorer.arrangement().order.last(), Some(&second.id));
        assert_eq!(port.get(&arrangement_key(&project.id)).unwrap().len(), 9);
    }

    #[test]
    fn test_rename_commit_and_cancel() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let photos = folder_id(&explorer, "Photos");

        explorer.begin_rename(&photos).unwrap();
        explorer.edit_rename(&photos, "Pics").unwrap();
        explorer.cancel_rename(&photos).unwrap();
        assert_eq!(explorer.folder(&photos).unwrap().title, "Photos");

        let unchanged = explorer.rename_folder(&photos, " Photos ", &mut storage.remote("dana")).unwrap();
        assert_eq!(unchanged, None);

        let sync = explorer
            .rename_folder(&photos, "Site Photos", &mut storage.remote("dana"))
            .unwrap();
        assert_eq!(sync, Some(RemoteSync::Confirmed));
        assert_eq!(storage.get_folder(&photos).unwrap().unwrap().title, "Site Photos");
    }

    #[test]
    fn test_delete_folder_drops_files_and_arrangement_entry() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let attachments = folder_id(&explorer, "Attachments");
        storage
            .add_file(&ProjectFile::new(&project.id, &attachments, "door-schedule.docx"), "test")
            .unwrap();

        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let removed = explorer.delete_folder(&attachments, &mut storage.remote("dana")).unwrap();
        assert_eq!(removed, 1);
        assert!(explorer.arrangement().position(&attachments).is_none());
        assert_eq!(explorer.sections("").folder_count(), 6);
        assert!(storage.get_folder(&attachments).unwrap().is_none());
    }

    #[test]
    fn test_failed_delete_changes_nothing_locally() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let plans = folder_id(&explorer, "Plans");
        let mut offline = FakeRemote {
            fail: true,
            ..FakeRemote::default()
        };
        assert!(explorer.delete_folder(&plans, &mut offline).is_err());
        assert!(explorer.folder(&plans).is_some());
    }

    #[test]
    fn test_rename_file_rejects_blank() {
        let (mut storage, project) = seeded();
        let port = MemoryArrangementPort::new();
        let mut explorer = ProjectExplorer::load(&project.id, &storage.remote("test"), &port).unwrap();
        let mut remote = FakeRemote::default();
        assert!(matches!(
            explorer.rename_file("f", "  ", &mut remote),
            Err(Error::RequiredField(_))
        ));
    }
}
