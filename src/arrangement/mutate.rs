//! Drag-and-drop mutations of an arrangement.
//!
//! Both functions are pure: they take the current arrangement and return the
//! next one. Persisting and calling the remote store is the caller's job
//! (see [`super::ArrangementStore`]).

use super::Arrangement;
use crate::error::{Error, Result};

/// Move `dragged_id` to the drop slot `target_index`.
///
/// Slots are numbered in the pre-move order: slot `i` is the gap before
/// `order[i]`, slot `len` is the end. The separator follows the folder
/// across the boundary: above→below decrements it, below→above increments
/// it, any other move leaves it alone. Dropping on the boundary slot itself
/// keeps the folder on its own side.
///
/// # Errors
///
/// Returns `FolderNotFound` if `dragged_id` is not in the arrangement.
pub fn move_folder(arrangement: &Arrangement, dragged_id: &str, target_index: usize) -> Result<Arrangement> {
    let from = arrangement
        .position(dragged_id)
        .ok_or_else(|| Error::FolderNotFound {
            id: dragged_id.to_string(),
        })?;

    let target = target_index.min(arrangement.len());
    let mut order = arrangement.order.clone();
    let id = order.remove(from);

    // Removal shifts every later slot left by one.
    let insert_at = if from < target { target - 1 } else { target };
    order.insert(insert_at.min(order.len()), id);

    let mut separator = arrangement.separator_index;
    if let Some(s) = arrangement.separator() {
        if from < s && target > s {
            separator -= 1;
        } else if from >= s && target < s {
            separator += 1;
        }
    }

    Ok(Arrangement::new(order, separator))
}

/// Move the separator line to `new_index`, clamped to `[0, len]`.
#[must_use]
pub fn move_separator(arrangement: &Arrangement, new_index: i64) -> Arrangement {
    Arrangement::new(arrangement.order.clone(), new_index)
}
