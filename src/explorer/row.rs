//! Per-folder row state.
//!
//! A row is either being viewed, renamed or dragged, and independently
//! expanded or collapsed. Renaming keeps its own draft so Escape can throw
//! it away without touching the folder's title.

/// Interaction state of a folder row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowState {
    #[default]
    Viewing,
    Editing {
        draft_title: String,
    },
    Dragging,
}

/// Whether a folder's files are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    #[default]
    Expanded,
    Collapsed,
}

impl Expansion {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Expanded => Self::Collapsed,
            Self::Collapsed => Self::Expanded,
        }
    }
}

/// UI state for one folder row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FolderRow {
    pub state: RowState,
    pub expansion: Expansion,
}

impl FolderRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.expansion == Expansion::Expanded
    }

    /// Flip expanded/collapsed and return the new value.
    pub fn toggle(&mut self) -> Expansion {
        self.expansion = self.expansion.toggled();
        self.expansion
    }

    /// Enter rename mode with the current title as the draft.
    ///
    /// Ignored while dragging; re-entering keeps the existing draft.
    pub fn begin_rename(&mut self, current_title: &str) {
        if self.state == RowState::Viewing {
            self.state = RowState::Editing {
                draft_title: current_title.to_string(),
            };
        }
    }

    /// Replace the draft text while editing.
    pub fn edit_draft(&mut self, text: &str) {
        if let RowState::Editing { draft_title } = &mut self.state {
            text.clone_into(draft_title);
        }
    }

    /// Leave rename mode, returning the new title if it should be saved.
    ///
    /// Only a non-empty trimmed draft that differs from `current_title`
    /// produces a rename.
    pub fn commit_rename(&mut self, current_title: &str) -> Option<String> {
        let RowState::Editing { draft_title } = std::mem::take(&mut self.state) else {
            return None;
        };
        let title = draft_title.trim();
        (!title.is_empty() && title != current_title).then(|| title.to_string())
    }

    /// Leave rename mode and discard the draft.
    pub fn cancel_rename(&mut self) {
        if matches!(self.state, RowState::Editing { .. }) {
            self.state = RowState::Viewing;
        }
    }

    pub fn begin_drag(&mut self) {
        if self.state == RowState::Viewing {
            self.state = RowState::Dragging;
        }
    }

    pub fn end_drag(&mut self) {
        if self.state == RowState::Dragging {
            self.state = RowState::Viewing;
        }
    }
}
