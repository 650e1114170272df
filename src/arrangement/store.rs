//! Arrangement persistence.
//!
//! [`ArrangementPort`] is the key-value seam the arrangement is saved
//! through. It is keyed per project and holds one JSON record. Writes
//! are last-write-wins; there is no cross-process merge.
//!
//! [`ArrangementStore`] owns the live arrangement for one project. Every
//! failure to read or write the port is logged and swallowed: a broken
//! store degrades to the default arrangement, never to a failed command.

use super::{default_arrangement, move_folder, move_separator, reconcile, Arrangement, Outcome};
use crate::error::Result;
use crate::model::Folder;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Project-scoped key under which an arrangement is stored.
#[must_use]
pub fn arrangement_key(project_id: &str) -> String {
    format!("planroom:folder-arrangement:{project_id}")
}

/// Key-value persistence for arrangements.
pub trait ArrangementPort {
    /// Load the saved arrangement for `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be read or parsed.
    fn load(&self, key: &str) -> Result<Option<Arrangement>>;

    /// Save `arrangement` under `key`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, key: &str, arrangement: &Arrangement) -> Result<()>;
}

impl<P: ArrangementPort + ?Sized> ArrangementPort for &P {
    fn load(&self, key: &str) -> Result<Option<Arrangement>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, arrangement: &Arrangement) -> Result<()> {
        (**self).save(key, arrangement)
    }
}

/// In-process port holding serialized records.
///
/// Records are kept as JSON text so a corrupt entry behaves like a corrupt
/// file on disk. Used by tests and by `--dry-run`.
#[derive(Debug, Default)]
pub struct MemoryArrangementPort {
    records: RefCell<HashMap<String, String>>,
}

impl MemoryArrangementPort {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw record text, bypassing serialization.
    pub fn insert_raw(&self, key: &str, raw: &str) {
        self.records
            .borrow_mut()
            .insert(key.to_string(), raw.to_string());
    }

    /// Parsed record for `key`, if present and valid.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arrangement> {
        self.load(key).ok().flatten()
    }
}

impl ArrangementPort for MemoryArrangementPort {
    fn load(&self, key: &str) -> Result<Option<Arrangement>> {
        match self.records.borrow().get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, key: &str, arrangement: &Arrangement) -> Result<()> {
        let raw = serde_json::to_string(arrangement)?;
        self.records.borrow_mut().insert(key.to_string(), raw);
        Ok(())
    }
}

/// Live arrangement for one project, persisted through a port.
#[derive(Debug)]
pub struct ArrangementStore<P: ArrangementPort> {
    key: String,
    port: P,
    current: Arrangement,
    outcome: Outcome,
    /// Separator value before an in-progress drag, if one is active.
    drag_origin: Option<i64>,
}

impl<P: ArrangementPort> ArrangementStore<P> {
    /// Load, reconcile against `remote`, and persist any repair.
    ///
    /// A failed read falls back to the default arrangement for this session
    /// and deliberately leaves the stored record alone.
    pub fn open(key: String, port: P, remote: &[Folder]) -> Self {
        let (saved, read_ok) = match port.load(&key) {
            Ok(saved) => (saved, true),
            Err(e) => {
                warn!(key = %key, error = %e, "Could not read saved arrangement, using defaults");
                (None, false)
            }
        };

        let reconciled = reconcile(remote, saved.as_ref());
        if let Outcome::Repaired(reason) = reconciled.outcome {
            info!(key = %key, reason = reason.as_str(), "Rebuilt folder arrangement");
        }

        let store = Self {
            key,
            port,
            current: reconciled.arrangement,
            outcome: reconciled.outcome,
            drag_origin: None,
        };

        if read_ok && (reconciled.outcome.needs_persist() || saved.as_ref() != Some(&store.current)) {
            store.persist();
        }

        store
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn port(&self) -> &P {
        &self.port
    }

    #[must_use]
    pub fn arrangement(&self) -> &Arrangement {
        &self.current
    }

    /// Folder ids above the separator.
    #[must_use]
    pub fn above(&self) -> &[String] {
        self.current.above()
    }

    /// Folder ids below the separator.
    #[must_use]
    pub fn below(&self) -> &[String] {
        self.current.below()
    }

    /// How the arrangement was produced when the store was opened.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Reorder a folder and persist.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder is not arranged.
    pub fn move_folder(&mut self, folder_id: &str, target_index: usize) -> Result<&Arrangement> {
        self.current = move_folder(&self.current, folder_id, target_index)?;
        debug!(folder = folder_id, target_index, separator = self.current.separator_index, "Moved folder");
        self.persist();
        Ok(&self.current)
    }

    /// Start dragging the separator line.
    pub fn begin_separator_drag(&mut self) {
        if self.drag_origin.is_none() {
            self.drag_origin = Some(self.current.separator_index);
        }
    }

    /// Intermediate separator position while dragging. Not persisted.
    pub fn drag_separator(&mut self, new_index: i64) -> &Arrangement {
        self.begin_separator_drag();
        self.current = move_separator(&self.current, new_index);
        &self.current
    }

    /// Finish a separator drag, persisting only if the line moved.
    pub fn release_separator(&mut self) -> &Arrangement {
        if let Some(origin) = self.drag_origin.take() {
            if origin != self.current.separator_index {
                self.persist();
            }
        }
        &self.current
    }

    /// Drag-and-release in one step.
    pub fn move_separator(&mut self, new_index: i64) -> &Arrangement {
        self.drag_separator(new_index);
        self.release_separator()
    }

    /// Re-reconcile after the remote folder set changed.
    pub fn refresh(&mut self, remote: &[Folder]) -> &Arrangement {
        let reconciled = reconcile(remote, Some(&self.current));
        if reconciled.arrangement != self.current {
            self.current = reconciled.arrangement;
            self.persist();
        }
        &self.current
    }

    /// Throw away the manual arrangement and persist the defaults.
    pub fn reset(&mut self, remote: &[Folder]) -> &Arrangement {
        self.current = default_arrangement(remote);
        self.drag_origin = None;
        self.persist();
        &self.current
    }

    /// Put back a previous arrangement and persist it.
    pub fn restore(&mut self, arrangement: Arrangement) -> &Arrangement {
        self.current = arrangement;
        self.drag_origin = None;
        self.persist();
        &self.current
    }

    fn persist(&self) {
        if let Err(e) = self.port.save(&self.key, &self.current) {
            warn!(key = %self.key, error = %e, "Could not save folder arrangement");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{RepairReason, DEFAULT_SEPARATOR, LEGACY_SEPARATOR};
    use crate::error::Error;

    fn folder(id: &str, title: &str) -> Folder {
        Folder {
            id: id.to_string(),
            project_id: "p".to_string(),
            title: title.to_string(),
            sort_order: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn remote() -> Vec<Folder> {
        vec![
            folder("pre", "Pre-Design"),
            folder("des", "Design"),
            folder("per", "Permit"),
            folder("bld", "Build"),
            folder("pla", "Plans"),
            folder("pho", "Photos"),
            folder("att", "Attachments"),
            folder("mep", "MEP"),
        ]
    }

    /// Port whose writes always fail.
    struct ReadOnlyPort(MemoryArrangementPort);

    impl ArrangementPort for ReadOnlyPort {
        fn load(&self, key: &str) -> Result<Option<Arrangement>> {
            self.0.load(key)
        }

        fn save(&self, _key: &str, _arrangement: &Arrangement) -> Result<()> {
            Err(Error::Other("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_open_persists_initial_defaults() {
        let port = MemoryArrangementPort::new();
        let store = ArrangementStore::open("k".into(), &port, &remote());
        assert_eq!(store.outcome(), Outcome::Initialized);
        assert_eq!(port.get("k").as_ref(), Some(store.arrangement()));
    }

    #[test]
    fn test_open_repairs_legacy_record() {
        let port = MemoryArrangementPort::new();
        port.insert_raw("k", r#"{"order":["x","y","z"],"separatorIndex":3}"#);
        let store = ArrangementStore::open("k".into(), &port, &remote());
        assert_eq!(store.outcome(), Outcome::Repaired(RepairReason::LegacySeparator));
        let saved = port.get("k").unwrap();
        assert_eq!(saved.separator_index, DEFAULT_SEPARATOR);
        assert_ne!(saved.separator_index, LEGACY_SEPARATOR);
    }

    #[test]
    fn test_reorder_survives_reopen_with_partial_phase_set() {
        let port = MemoryArrangementPort::new();
        let folders = vec![
            folder("pre", "Pre-Design"),
            folder("des", "Design"),
            folder("per", "Permit"),
            folder("mep", "MEP"),
            folder("str", "Structural"),
        ];
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        assert_eq!(store.arrangement().separator_index, DEFAULT_SEPARATOR);
        store.move_folder("str", 3).unwrap();
        let moved = store.arrangement().clone();

        let reopened = ArrangementStore::open("k".into(), &port, &folders);
        assert_eq!(reopened.outcome(), Outcome::Restored { appended: 0 });
        assert_eq!(reopened.arrangement(), &moved);
        assert_eq!(reopened.arrangement().order, ["pre", "des", "per", "str", "mep"]);
    }

    #[test]
    fn test_three_folder_project_keeps_reorder() {
        let port = MemoryArrangementPort::new();
        let folders = vec![
            folder("pre", "Pre-Design"),
            folder("mep", "MEP"),
            folder("str", "Structural"),
        ];
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        assert_eq!(store.arrangement().separator_index, LEGACY_SEPARATOR);
        store.move_folder("str", 1).unwrap();

        let reopened = ArrangementStore::open("k".into(), &port, &folders);
        assert_eq!(reopened.outcome(), Outcome::Restored { appended: 0 });
        assert_eq!(reopened.arrangement().order, ["pre", "str", "mep"]);
    }

    #[test]
    fn test_corrupt_record_falls_back_without_overwriting() {
        let port = MemoryArrangementPort::new();
        port.insert_raw("k", "{not json");
        let store = ArrangementStore::open("k".into(), &port, &remote());
        assert_eq!(store.outcome(), Outcome::Initialized);
        assert_eq!(store.arrangement().separator_index, DEFAULT_SEPARATOR);
        assert!(port.get("k").is_none());
    }

    #[test]
    fn test_move_folder_persists() {
        let port = MemoryArrangementPort::new();
        let mut store = ArrangementStore::open("k".into(), &port, &remote());
        store.move_folder("mep", 5).unwrap();
        let saved = port.get("k").unwrap();
        assert_eq!(saved.order[5], "mep");
        assert_eq!(&saved, store.arrangement());
    }

    #[test]
    fn test_separator_persists_on_release_only() {
        let port = MemoryArrangementPort::new();
        let mut store = ArrangementStore::open("k".into(), &port, &remote());

        store.begin_separator_drag();
        store.drag_separator(6);
        store.drag_separator(7);
        assert_eq!(port.get("k").unwrap().separator_index, DEFAULT_SEPARATOR);

        store.release_separator();
        assert_eq!(port.get("k").unwrap().separator_index, 7);
    }

    #[test]
    fn test_save_failure_does_not_fail_moves() {
        let port = ReadOnlyPort(MemoryArrangementPort::new());
        let mut store = ArrangementStore::open("k".into(), port, &remote());
        let moved = store.move_folder("mep", 0).unwrap();
        assert_eq!(moved.order[0], "mep");
        assert_eq!(moved.separator_index, DEFAULT_SEPARATOR + 1);
    }

    #[test]
    fn test_refresh_appends_new_folder() {
        let port = MemoryArrangementPort::new();
        let mut folders = remote();
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        folders.push(folder("new", "New Folder"));
        store.refresh(&folders);
        assert_eq!(store.arrangement().order.last().map(String::as_str), Some("new"));
        assert_eq!(port.get("k").unwrap().len(), 9);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let port = MemoryArrangementPort::new();
        let folders = remote();
        let mut store = ArrangementStore::open("k".into(), &port, &folders);
        store.move_separator(1);
        store.reset(&folders);
        assert_eq!(port.get("k").unwrap().separator_index, DEFAULT_SEPARATOR);
    }

    #[test]
    fn test_restore_persists_previous_order() {
        let port = MemoryArrangementPort::new();
        let mut store = ArrangementStore::open("k".into(), &port, &remote());
        let before = store.arrangement().clone();
        store.move_folder("mep", 0).unwrap();
        store.restore(before.clone());
        assert_eq!(store.arrangement(), &before);
        assert_eq!(port.get("k"), Some(before));
    }

    #[test]
    fn test_last_write_wins_between_stores() {
        let port = MemoryArrangementPort::new();
        let folders = remote();
        let mut first = ArrangementStore::open("k".into(), &port, &folders);
        let mut second = ArrangementStore::open("k".into(), &port, &folders);
        first.move_separator(6);
        second.move_separator(2);
        assert_eq!(port.get("k").unwrap().separator_index, 2);
    }
}
