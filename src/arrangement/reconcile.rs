//! Reconcile a saved arrangement against the latest remote folder list.
//!
//! The remote list is authoritative for *which* folders exist; the saved
//! arrangement is authoritative for *where* they go, as long as it still
//! looks sane. Two kinds of saved state are discarded and rebuilt from the
//! canonical defaults:
//!
//! - an unversioned record with a separator of [`LEGACY_SEPARATOR`]
//!   (written by an older build)
//! - an order whose leading titles no longer follow the canonical sequence

use super::{Arrangement, CANONICAL_FOLDERS, DEFAULT_SEPARATOR};
use crate::model::Folder;
use std::collections::HashMap;

/// Why a saved arrangement was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairReason {
    /// Saved separator carried the legacy off-by-one value.
    LegacySeparator,
    /// Leading titles did not match the canonical sequence.
    StaleOrder,
}

impl RepairReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LegacySeparator => "legacy_separator",
            Self::StaleOrder => "stale_order",
        }
    }
}

/// How the reconciled arrangement came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No saved arrangement; defaults were computed.
    Initialized,
    /// The saved arrangement was applied. `appended` folders were unknown
    /// to it and went to the end in remote order.
    Restored { appended: usize },
    /// The saved arrangement was discarded and defaults rebuilt.
    Repaired(RepairReason),
}

impl Outcome {
    /// Whether the result should be written back immediately.
    #[must_use]
    pub const fn needs_persist(&self) -> bool {
        !matches!(self, Self::Restored { appended: 0 })
    }
}

/// Result of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub arrangement: Arrangement,
    pub outcome: Outcome,
}

/// Produce the display arrangement for `remote` given the saved state.
///
/// `remote` order is only used as a tie-breaker: folders unknown to the
/// saved order keep their relative remote order at the end.
#[must_use]
pub fn reconcile(remote: &[Folder], saved: Option<&Arrangement>) -> Reconciled {
    // An empty saved order carries nothing worth restoring.
    let Some(saved) = saved.filter(|s| !s.order.is_empty()) else {
        return Reconciled {
            arrangement: default_arrangement(remote),
            outcome: Outcome::Initialized,
        };
    };

    if saved.is_legacy() {
        return repaired(remote, RepairReason::LegacySeparator);
    }

    let rank: HashMap<&str, usize> = saved
        .order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut sorted: Vec<&Folder> = remote.iter().collect();
    // Stable: unknown ids share usize::MAX and keep remote order.
    sorted.sort_by_key(|f| rank.get(f.id.as_str()).copied().unwrap_or(usize::MAX));

    if !leading_titles_canonical(&sorted, remote) {
        return repaired(remote, RepairReason::StaleOrder);
    }

    let appended = remote
        .iter()
        .filter(|f| !rank.contains_key(f.id.as_str()))
        .count();

    Reconciled {
        arrangement: Arrangement::new(
            sorted.into_iter().map(|f| f.id.clone()).collect(),
            saved.separator_index,
        ),
        outcome: Outcome::Restored { appended },
    }
}

/// Default arrangement: canonical titles first in canonical order, then the
/// rest alphabetically. The separator sits after the fourth row, or at the
/// end of a shorter list.
#[must_use]
pub fn default_arrangement(remote: &[Folder]) -> Arrangement {
    let order = default_sorted(remote).into_iter().map(|f| f.id.clone()).collect();
    Arrangement::new(order, DEFAULT_SEPARATOR)
}

fn repaired(remote: &[Folder], reason: RepairReason) -> Reconciled {
    Reconciled {
        arrangement: default_arrangement(remote),
        outcome: Outcome::Repaired(reason),
    }
}

fn default_sorted(remote: &[Folder]) -> Vec<&Folder> {
    let mut sorted: Vec<&Folder> = remote.iter().collect();
    sorted.sort_by_cached_key(|f| default_key(&f.title));
    sorted
}

fn default_key(title: &str) -> (usize, String) {
    match CANONICAL_FOLDERS.iter().position(|c| *c == title) {
        Some(i) => (i, String::new()),
        None => (CANONICAL_FOLDERS.len(), title.to_lowercase()),
    }
}

/// The first K titles must equal the canonical prefix, where K is how many
/// canonical titles the remote set contains.
fn leading_titles_canonical(sorted: &[&Folder], remote: &[Folder]) -> bool {
    let expected = default_sorted(remote);
    let k = remote
        .iter()
        .filter(|f| CANONICAL_FOLDERS.contains(&f.title.as_str()))
        .count()
        .min(CANONICAL_FOLDERS.len());

    sorted
        .iter()
        .zip(expected.iter())
        .take(k)
        .all(|(got, want)| got.title == want.title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{LEGACY_SEPARATOR, NO_SEPARATOR};

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

    /// All seven canonical folders, created in a scrambled order.
    fn canonical_set() -> Vec<Folder> {
        vec![
            folder("att", "Attachments"),
            folder("bld", "Build"),
            folder("pre", "Pre-Design"),
            folder("pho", "Photos"),
            folder("des", "Design"),
            folder("pla", "Plans"),
            folder("per", "Permit"),
        ]
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    /// A record as the older build wrote it: no version field.
    fn unversioned(order: &[&str], separator: i64) -> Arrangement {
        serde_json::from_value(serde_json::json!({
            "order": order,
            "separatorIndex": separator,
        }))
        .unwrap()
    }

    #[test]
    fn test_default_orders_canonical_then_alphabetical() {
        let mut remote = canonical_set();
        remote.push(folder("zz", "zoning"));
        remote.push(folder("bb", "Bids"));

        let r = reconcile(&remote, None);
        assert_eq!(r.outcome, Outcome::Initialized);
        assert_eq!(
            r.arrangement.order,
            ids(&["pre", "des", "per", "bld", "pla", "pho", "att", "bb", "zz"])
        );
        assert_eq!(r.arrangement.separator_index, DEFAULT_SEPARATOR);
    }

    #[test]
    fn test_partial_canonical_set() {
        let remote = vec![
            folder("a", "Attachments"),
            folder("b", "Design"),
            folder("c", "Permit"),
        ];
        let r = reconcile(&remote, None);
        assert_eq!(r.arrangement.order, ids(&["b", "c", "a"]));
        // Three canonical titles, capped at the list length.
        assert_eq!(r.arrangement.separator_index, 3);
    }

    #[test]
    fn test_default_separator_ignores_which_titles_are_present() {
        let remote = vec![
            folder("pla", "Plans"),
            folder("pho", "Photos"),
            folder("att", "Attachments"),
            folder("mep", "MEP"),
            folder("zon", "Zoning"),
        ];
        assert_eq!(default_arrangement(&remote).separator_index, DEFAULT_SEPARATOR);
    }

    #[test]
    fn test_empty_remote_uses_sentinel() {
        let r = reconcile(&[], None);
        assert!(r.arrangement.order.is_empty());
        assert_eq!(r.arrangement.separator_index, NO_SEPARATOR);
    }

    #[test]
    fn test_legacy_separator_always_rebuilds() {
        let remote = canonical_set();
        let saved = unversioned(&["x", "y", "z"], LEGACY_SEPARATOR);
        let r = reconcile(&remote, Some(&saved));
        assert_eq!(r.outcome, Outcome::Repaired(RepairReason::LegacySeparator));
        assert_eq!(r.arrangement.separator_index, DEFAULT_SEPARATOR);
        assert_eq!(r.arrangement, default_arrangement(&remote));
    }

    #[test]
    fn test_legacy_repair_without_phase_folders() {
        let remote = vec![
            folder("pla", "Plans"),
            folder("pho", "Photos"),
            folder("att", "Attachments"),
            folder("mep", "MEP"),
            folder("zon", "Zoning"),
        ];
        let saved = unversioned(&["x", "y", "z"], LEGACY_SEPARATOR);
        let r = reconcile(&remote, Some(&saved));
        assert_eq!(r.outcome, Outcome::Repaired(RepairReason::LegacySeparator));
        assert_eq!(r.arrangement.separator_index, DEFAULT_SEPARATOR);
    }

    #[test]
    fn test_separator_at_three_written_by_this_build_is_kept() {
        let remote = vec![
            folder("a", "Attachments"),
            folder("b", "Design"),
            folder("c", "Permit"),
        ];
        let first = reconcile(&remote, None).arrangement;
        assert_eq!(first.separator_index, LEGACY_SEPARATOR);

        let second = reconcile(&remote, Some(&first));
        assert_eq!(second.outcome, Outcome::Restored { appended: 0 });
        assert_eq!(second.arrangement, first);
    }

    #[test]
    fn test_idempotent_on_default() {
        let mut remote = canonical_set();
        remote.push(folder("c1", "Structural"));
        let first = reconcile(&remote, None).arrangement;
        let second = reconcile(&remote, Some(&first));
        assert_eq!(second.arrangement, first);
        assert_eq!(second.outcome, Outcome::Restored { appended: 0 });
        assert!(!second.outcome.needs_persist());
    }

    #[test]
    fn test_restores_custom_order_and_separator() {
        let mut remote = canonical_set();
        remote.push(folder("c1", "Structural"));
        remote.push(folder("c2", "MEP"));
        let mut saved = reconcile(&remote, None).arrangement;
        // User moved Structural after MEP and pulled the separator down.
        let n = saved.order.len();
        saved.order.swap(n - 1, n - 2);
        saved.separator_index = 6;

        let r = reconcile(&remote, Some(&saved));
        assert_eq!(r.arrangement, saved);
    }

    #[test]
    fn test_unknown_folders_append_in_remote_order() {
        let remote = canonical_set();
        let saved = reconcile(&remote, None).arrangement;

        let mut grown = remote.clone();
        grown.push(folder("n2", "Zeta"));
        grown.push(folder("n1", "Alpha"));

        let r = reconcile(&grown, Some(&saved));
        assert_eq!(r.outcome, Outcome::Restored { appended: 2 });
        assert_eq!(&r.arrangement.order[7..], &ids(&["n2", "n1"])[..]);
        assert!(r.outcome.needs_persist());
    }

    #[test]
    fn test_stale_order_rebuilds() {
        let remote = canonical_set();
        // Saved in remote creation order: Attachments leads.
        let saved = Arrangement::new(remote.iter().map(|f| f.id.clone()).collect(), 4);
        let r = reconcile(&remote, Some(&saved));
        assert_eq!(r.outcome, Outcome::Repaired(RepairReason::StaleOrder));
        assert_eq!(r.arrangement, default_arrangement(&remote));
    }

    #[test]
    fn test_removed_folders_drop_out() {
        let remote = canonical_set();
        let saved = reconcile(&remote, None).arrangement;
        let shrunk: Vec<Folder> = remote.into_iter().filter(|f| f.id != "pho").collect();
        let r = reconcile(&shrunk, Some(&saved));
        assert!(!r.arrangement.order.contains(&"pho".to_string()));
        assert_eq!(r.arrangement.len(), 6);
    }

    #[test]
    fn test_empty_saved_order_is_treated_as_missing() {
        let remote = canonical_set();
        let r = reconcile(&remote, Some(&Arrangement::empty()));
        assert_eq!(r.outcome, Outcome::Initialized);
    }

    #[test]
    fn test_canonical_titles_precede_others_for_any_mix() {
        let titles = ["Photos", "a-custom", "Build", "Zed", "Design", "Attachments", "mid"];
        let remote: Vec<Folder> = titles
            .iter()
            .enumerate()
            .map(|(i, t)| folder(&format!("f{i}"), t))
            .collect();
        let arr = reconcile(&remote, None).arrangement;
        let ordered: Vec<&str> = arr
            .order
            .iter()
            .map(|id| remote.iter().find(|f| &f.id == id).unwrap().title.as_str())
            .collect();
        assert_eq!(
            ordered,
            ["Design", "Build", "Photos", "Attachments", "a-custom", "mid", "Zed"]
        );
    }
}
