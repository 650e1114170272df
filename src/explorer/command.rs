//! Optimistic panel commands.
//!
//! Each drag or rename is applied to local state first, then mirrored to the
//! remote. A command remembers enough to undo its local change, but whether
//! a remote failure actually undoes it is the caller's [`RevertPolicy`].
//! The default keeps the optimistic state, so local and remote can drift
//! until the next fetch.

use super::file_lists::{DropPosition, FileLists, Placement};
use crate::arrangement::{Arrangement, ArrangementPort, ArrangementStore};
use crate::error::{Error, Result};
use crate::model::Folder;
use crate::storage::ProjectRemote;
use serde::Serialize;
use tracing::{debug, warn};

/// A local change with a matching remote call and an undo.
pub trait OptimisticCommand<S: ?Sized> {
    /// Apply the change to local state.
    ///
    /// # Errors
    ///
    /// Returns an error if the change cannot be applied. State is untouched.
    fn apply(&mut self, state: &mut S) -> Result<()>;

    /// Mirror the applied change to the remote.
    ///
    /// # Errors
    ///
    /// Returns whatever the remote call returned.
    fn remote(&self, remote: &mut dyn ProjectRemote) -> Result<()>;

    /// Undo a previous `apply`.
    fn revert(&mut self, state: &mut S);

    /// Short human description for logs.
    fn describe(&self) -> String;

    /// Whether the applied change has anything to send.
    fn needs_remote(&self) -> bool {
        true
    }
}

/// What to do with local state when the remote call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevertPolicy {
    /// Leave the optimistic change in place.
    #[default]
    Keep,
    /// Undo the local change.
    Revert,
}

/// How the remote side of a command went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sync", rename_all = "snake_case")]
pub enum RemoteSync {
    /// The remote accepted the change.
    Confirmed,
    /// Nothing needed sending.
    LocalOnly,
    /// The remote call failed.
    Failed { error: String, reverted: bool },
}

impl RemoteSync {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Apply `command` locally, send it, and handle a remote failure per `policy`.
///
/// # Errors
///
/// Only a failed local `apply` is an error. Remote failures are logged and
/// reported through [`RemoteSync::Failed`].
pub fn run_optimistic<S, C>(
    command: &mut C,
    state: &mut S,
    remote: &mut dyn ProjectRemote,
    policy: RevertPolicy,
) -> Result<RemoteSync>
where
    S: ?Sized,
    C: OptimisticCommand<S> + ?Sized,
{
    command.apply(state)?;
    if !command.needs_remote() {
        debug!(command = %command.describe(), "Applied locally");
        return Ok(RemoteSync::LocalOnly);
    }

    match command.remote(remote) {
        Ok(()) => {
            debug!(command = %command.describe(), "Remote confirmed");
            Ok(RemoteSync::Confirmed)
        }
        Err(e) => {
            let reverted = policy == RevertPolicy::Revert;
            warn!(command = %command.describe(), error = %e, reverted, "Remote update failed");
            if reverted {
                command.revert(state);
            }
            Ok(RemoteSync::Failed {
                error: e.to_string(),
                reverted,
            })
        }
    }
}

// ── Move file ─────────────────────────────────────────────────

/// Drag a file onto a row, possibly in another folder.
#[derive(Debug, Clone)]
pub struct MoveFileCommand {
    pub file_id: String,
    pub from_folder: String,
    pub to_folder: String,
    pub index: usize,
    pub position: DropPosition,
    origin: Option<Placement>,
    landed_at: Option<usize>,
}

impl MoveFileCommand {
    #[must_use]
    pub fn new(file_id: &str, from_folder: &str, to_folder: &str, index: usize, position: DropPosition) -> Self {
        Self {
            file_id: file_id.to_string(),
            from_folder: from_folder.to_string(),
            to_folder: to_folder.to_string(),
            index,
            position,
            origin: None,
            landed_at: None,
        }
    }

    /// Final index in the target folder, once applied.
    #[must_use]
    pub const fn landed_at(&self) -> Option<usize> {
        self.landed_at
    }
}

impl OptimisticCommand<FileLists> for MoveFileCommand {
    fn apply(&mut self, lists: &mut FileLists) -> Result<()> {
        let origin = lists
            .locate(&self.file_id)
            .ok_or_else(|| Error::FileNotFound { id: self.file_id.clone() })?;
        let landed = lists.move_file(&self.file_id, &self.from_folder, &self.to_folder, self.index, self.position)?;
        self.origin = Some(origin);
        self.landed_at = Some(landed);
        Ok(())
    }

    fn remote(&self, remote: &mut dyn ProjectRemote) -> Result<()> {
        remote.move_file(&self.file_id, &self.to_folder)
    }

    fn revert(&mut self, lists: &mut FileLists) {
        let Some(origin) = self.origin.take() else {
            return;
        };
        if let Some((file, _)) = lists.remove_file(&self.file_id) {
            lists.insert_file(&origin.folder_id, origin.index, file);
        }
        self.landed_at = None;
    }

    fn describe(&self) -> String {
        format!("move file {} from {} to {}", self.file_id, self.from_folder, self.to_folder)
    }

    fn needs_remote(&self) -> bool {
        self.from_folder != self.to_folder
    }
}

// ── Reorder folder ────────────────────────────────────────────

/// Drag a folder to a new display slot.
///
/// The remote call only records the new index; the arrangement store stays
/// authoritative for display order either way.
#[derive(Debug, Clone)]
pub struct ReorderFolderCommand {
    pub folder_id: String,
    pub target_index: usize,
    previous: Option<Arrangement>,
    landed_at: Option<usize>,
}

impl ReorderFolderCommand {
    #[must_use]
    pub fn new(folder_id: &str, target_index: usize) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            target_index,
            previous: None,
            landed_at: None,
        }
    }
}

impl<P: ArrangementPort> OptimisticCommand<ArrangementStore<P>> for ReorderFolderCommand {
    fn apply(&mut self, store: &mut ArrangementStore<P>) -> Result<()> {
        let previous = store.arrangement().clone();
        let moved = store.move_folder(&self.folder_id, self.target_index)?;
        self.landed_at = moved.position(&self.folder_id);
        self.previous = Some(previous);
        Ok(())
    }

    fn remote(&self, remote: &mut dyn ProjectRemote) -> Result<()> {
        remote.reorder_folder(&self.folder_id, self.landed_at.unwrap_or(self.target_index))
    }

    fn revert(&mut self, store: &mut ArrangementStore<P>) {
        if let Some(previous) = self.previous.take() {
            store.restore(previous);
        }
    }

    fn describe(&self) -> String {
        format!("reorder folder {} to {}", self.folder_id, self.target_index)
    }
}

// ── Rename folder ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenameFolderCommand {
    pub folder_id: String,
    pub title: String,
    previous: Option<String>,
}

impl RenameFolderCommand {
    #[must_use]
    pub fn new(folder_id: &str, title: &str) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            title: title.to_string(),
            previous: None,
        }
    }
}

impl OptimisticCommand<Vec<Folder>> for RenameFolderCommand {
    fn apply(&mut self, folders: &mut Vec<Folder>) -> Result<()> {
        let folder = folders
            .iter_mut()
            .find(|f| f.id == self.folder_id)
            .ok_or_else(|| Error::FolderNotFound { id: self.folder_id.clone() })?;
        self.previous = Some(std::mem::replace(&mut folder.title, self.title.clone()));
        Ok(())
    }

    fn remote(&self, remote: &mut dyn ProjectRemote) -> Result<()> {
        remote.rename_folder(&self.folder_id, &self.title)
    }

    fn revert(&mut self, folders: &mut Vec<Folder>) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        if let Some(folder) = folders.iter_mut().find(|f| f.id == self.folder_id) {
            folder.title = previous;
        }
    }

    fn describe(&self) -> String {
        format!("rename folder {} to {:?}", self.folder_id, self.title)
    }
}

// ── Rename file ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenameFileCommand {
    pub file_id: String,
    pub name: String,
    previous: Option<String>,
}

impl RenameFileCommand {
    #[must_use]
    pub fn new(file_id: &str, name: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            name: name.to_string(),
            previous: None,
        }
    }
}

impl OptimisticCommand<FileLists> for RenameFileCommand {
    fn apply(&mut self, lists: &mut FileLists) -> Result<()> {
        let previous = lists
            .rename_file(&self.file_id, &self.name)
            .ok_or_else(|| Error::FileNotFound { id: self.file_id.clone() })?;
        self.previous = Some(previous);
        Ok(())
    }

    fn remote(&self, remote: &mut dyn ProjectRemote) -> Result<()> {
        remote.rename_file(&self.file_id, &self.name)
    }

    fn revert(&mut self, lists: &mut FileLists) {
        if let Some(previous) = self.previous.take() {
            lists.rename_file(&self.file_id, &previous);
        }
    }

    fn describe(&self) -> String {
        format!("rename file {} to {:?}", self.file_id, self.name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::arrangement::MemoryArrangementPort;
    use crate::model::ProjectFile;
    use std::cell::Cell;

    /// Remote that counts calls and optionally fails every mutation.
    #[derive(Default)]
    pub(crate) struct FakeRemote {
        pub fail: bool,
        pub calls: Cell<usize>,
        pub folders: Vec<Folder>,
        pub files: Vec<ProjectFile>,
    }

    impl FakeRemote {
        fn call(&self) -> Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(Error::Other("remote offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl ProjectRemote for FakeRemote {
        fn fetch_folders(&self, _project_id: &str) -> Result<Vec<Folder>> {
            Ok(self.folders.clone())
        }

        fn fetch_files(&self, _project_id: &str) -> Result<Vec<ProjectFile>> {
            Ok(self.files.clone())
        }

        fn create_folder(&mut self, project_id: &str, title: &str) -> Result<Folder> {
            self.call()?;
            let folder = Folder::new(project_id, title);
            self.folders.push(folder.clone());
            Ok(folder)
        }

        fn rename_folder(&mut self, _folder_id: &str, _title: &str) -> Result<()> {
            self.call()
        }

        fn delete_folder(&mut self, _folder_id: &str) -> Result<()> {
            self.call()
        }

        fn reorder_folder(&mut self, _folder_id: &str, _index: usize) -> Result<()> {
            self.call()
        }

        fn move_file(&mut self, _file_id: &str, _folder_id: &str) -> Result<()> {
            self.call()
        }

        fn rename_file(&mut self, _file_id: &str, _name: &str) -> Result<()> {
            self.call()
        }

        fn delete_file(&mut self, _file_id: &str) -> Result<()> {
            self.call()
        }
    }

    fn file(id: &str, folder: &str) -> ProjectFile {
        let mut f = ProjectFile::new("p", folder, &format!("{id}.pdf"));
        f.id = id.to_string();
        f
    }

    fn lists() -> FileLists {
        FileLists::group([file("a1", "A"), file("a2", "A"), file("b1", "B")])
    }

    fn failing() -> FakeRemote {
        FakeRemote {
            fail: true,
            ..FakeRemote::default()
        }
    }

    #[test]
    fn test_same_folder_move_skips_remote() {
        let mut l = lists();
        let mut remote = FakeRemote::default();
        let mut cmd = MoveFileCommand::new("a1", "A", "A", 1, DropPosition::Below);
        let sync = run_optimistic(&mut cmd, &mut l, &mut remote, RevertPolicy::Keep).unwrap();
        assert_eq!(sync, RemoteSync::LocalOnly);
        assert_eq!(remote.calls.get(), 0);
        assert_eq!(l.files("A")[1].id, "a1");
    }

    #[test]
    fn test_failed_move_is_kept_by_default() {
        let mut l = lists();
        let mut remote = failing();
        let mut cmd = MoveFileCommand::new("a1", "A", "B", 0, DropPosition::Above);
        let sync = run_optimistic(&mut cmd, &mut l, &mut remote, RevertPolicy::default()).unwrap();
        assert!(matches!(sync, RemoteSync::Failed { reverted: false, .. }));
        assert_eq!(l.files("B")[0].id, "a1");
    }

    #[test]
    fn test_failed_move_reverts_when_asked() {
        let mut l = lists();
        let mut remote = failing();
        let mut cmd = MoveFileCommand::new("a1", "A", "B", 0, DropPosition::Above);
        let sync = run_optimistic(&mut cmd, &mut l, &mut remote, RevertPolicy::Revert).unwrap();
        assert!(matches!(sync, RemoteSync::Failed { reverted: true, .. }));
        assert_eq!(l, lists());
    }

    #[test]
    fn test_failed_apply_never_calls_remote() {
        let mut l = lists();
        let mut remote = FakeRemote::default();
        let mut cmd = MoveFileCommand::new("zz", "A", "B", 0, DropPosition::Above);
        assert!(run_optimistic(&mut cmd, &mut l, &mut remote, RevertPolicy::Keep).is_err());
        assert_eq!(remote.calls.get(), 0);
    }

    #[test]
    fn test_reorder_revert_restores_arrangement() {
        let folders = vec![Folder::new("p", "Design"), Folder::new("p", "Build"), Folder::new("p", "MEP")];
        let port = MemoryArrangementPort::new();
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        let before = store.arrangement().clone();

        let mut remote = failing();
        let mut cmd = ReorderFolderCommand::new(&folders[2].id, 0);
        run_optimistic(&mut cmd, &mut store, &mut remote, RevertPolicy::Revert).unwrap();
        assert_eq!(store.arrangement(), &before);
        assert_eq!(port.get("k"), Some(before));
    }

    #[test]
    fn test_reorder_confirmed() {
        let folders = vec![Folder::new("p", "Design"), Folder::new("p", "MEP")];
        let port = MemoryArrangementPort::new();
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        let mut remote = FakeRemote::default();
        let mut cmd = ReorderFolderCommand::new(&folders[1].id, 0);
        let sync = run_optimistic(&mut cmd, &mut store, &mut remote, RevertPolicy::Keep).unwrap();
        assert_eq!(sync, RemoteSync::Confirmed);
        assert_eq!(store.arrangement().order[0], folders[1].id);
    }

    #[test]
    fn test_rename_folder_revert() {
        let mut folders = vec![Folder::new("p", "Photos")];
        let id = folders[0].id.clone();
        let mut remote = failing();
        let mut cmd = RenameFolderCommand::new(&id, "Site Photos");
        run_optimistic(&mut cmd, &mut folders, &mut remote, RevertPolicy::Revert).unwrap();
        assert_eq!(folders[0].title, "Photos");

        let mut cmd = RenameFolderCommand::new(&id, "Site Photos");
        run_optimistic(&mut cmd, &mut folders, &mut remote, RevertPolicy::Keep).unwrap();
        assert_eq!(folders[0].title, "Site Photos");
    }

    #[test]
    fn test_rename_file_revert() {
        let mut l = lists();
        let mut remote = failing();
        let mut cmd = RenameFileCommand::new("b1", "elevations.pdf");
        run_optimistic(&mut cmd, &mut l, &mut remote, RevertPolicy::Revert).unwrap();
        assert_eq!(l.get("b1").unwrap().name, "b1.pdf");
    }
}
