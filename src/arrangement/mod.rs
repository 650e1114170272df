//! Manual folder arrangement for the project explorer.
//!
//! The remote store returns folders in creation order. The arrangement is a
//! client-local overlay on top of that list: an explicit id order plus a
//! separator index that splits folders into an "above" group (the pinned
//! phase folders) and a "below" group (everything else).
//!
//! # Submodules
//!
//! - [`reconcile`] - Merge a saved arrangement with the latest remote folders
//! - [`mutate`] - Drag-and-drop reorder and separator moves (pure functions)
//! - [`store`] - Persistence port and the stateful `ArrangementStore`

pub mod mutate;
pub mod reconcile;
pub mod store;

pub use mutate::{move_folder, move_separator};
pub use reconcile::{default_arrangement, reconcile, Outcome, Reconciled, RepairReason};
pub use store::{arrangement_key, ArrangementPort, ArrangementStore, MemoryArrangementPort};

use serde::{Deserialize, Serialize};

/// Canonical folder titles, in display order.
pub const CANONICAL_FOLDERS: [&str; 7] = [
    "Pre-Design",
    "Design",
    "Permit",
    "Build",
    "Plans",
    "Photos",
    "Attachments",
];

/// Separator position after the four phase folders.
pub const DEFAULT_SEPARATOR: i64 = 4;

/// Separator value written by an older build that placed the line one row
/// too high. Unversioned records carrying it are rebuilt.
pub const LEGACY_SEPARATOR: i64 = 3;

/// Record version written by this build. Records from the older build carry
/// no version and deserialize as `0`.
pub const ARRANGEMENT_VERSION: u32 = 1;

/// Separator sentinel for an empty folder list: nothing is rendered.
pub const NO_SEPARATOR: i64 = -1;

/// The user's visual ordering of a project's folders.
///
/// Serialized as `{"version": 1, "order": [...], "separatorIndex": n}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Arrangement {
    /// Record format version, `0` when absent.
    #[serde(default)]
    pub version: u32,
    /// Folder ids in display order.
    pub order: Vec<String>,
    /// Boundary between `order[..separator]` and `order[separator..]`.
    pub separator_index: i64,
}

impl Arrangement {
    /// Build an arrangement, clamping the separator into `[0, order.len()]`.
    ///
    /// An empty order always carries [`NO_SEPARATOR`].
    #[must_use]
    pub fn new(order: Vec<String>, separator_index: i64) -> Self {
        if order.is_empty() {
            return Self::empty();
        }
        let max = i64::try_from(order.len()).unwrap_or(i64::MAX);
        Self {
            version: ARRANGEMENT_VERSION,
            order,
            separator_index: separator_index.clamp(0, max),
        }
    }

    /// The arrangement of a project without folders.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            version: ARRANGEMENT_VERSION,
            order: Vec::new(),
            separator_index: NO_SEPARATOR,
        }
    }

    /// Whether this record was written by the build with the off-by-one
    /// separator and must be rebuilt.
    #[must_use]
    pub const fn is_legacy(&self) -> bool {
        self.version < ARRANGEMENT_VERSION && self.separator_index == LEGACY_SEPARATOR
    }

    /// Separator as an index, or `None` when no separator is rendered.
    #[must_use]
    pub fn separator(&self) -> Option<usize> {
        usize::try_from(self.separator_index)
            .ok()
            .map(|s| s.min(self.order.len()))
    }

    /// Folder ids above the separator.
    #[must_use]
    pub fn above(&self) -> &[String] {
        match self.separator() {
            Some(s) => &self.order[..s],
            None => &[],
        }
    }

    /// Folder ids below the separator.
    #[must_use]
    pub fn below(&self) -> &[String] {
        match self.separator() {
            Some(s) => &self.order[s..],
            None => &self.order,
        }
    }

    /// Position of a folder id in the display order.
    #[must_use]
    pub fn position(&self, folder_id: &str) -> Option<usize> {
        self.order.iter().position(|id| id == folder_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
