//! Project model for Planroom.
//!
//! A project is one job for the firm (a house, a remodel, a permit set).
//! It owns folders, files and tasks, and hands out task short IDs.

use serde::{Deserialize, Serialize};

/// A project in Planroom.
///
/// Projects provide:
/// - Task ID prefixes (e.g., "OAKS" -> OAKS-1, OAKS-2)
/// - The folder set shown in the explorer panel
/// - Lifecycle status and design/build phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier (UUID format)
    pub id: String,

    /// Display name for the project
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// One of pending, active, completed, archived
    pub status: String,

    /// One of Pre-Design, Design, Permit, Build
    pub phase: String,

    /// Site address, free form
    pub address: Option<String>,

    /// Prefix for task short IDs
    pub task_prefix: String,

    /// Next task number to assign
    #[serde(default = "default_one")]
    pub next_task_number: i32,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

fn default_one() -> i32 {
    1
}

impl Project {
    /// Create a new project with default status and phase.
    #[must_use]
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let task_prefix = derive_prefix(&name);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description: None,
            status: "pending".to_string(),
            phase: "Pre-Design".to_string(),
            address: None,
            task_prefix,
            next_task_number: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate the next task short ID.
    #[must_use]
    pub fn next_task_short_id(&self) -> String {
        format!("{}-{}", self.task_prefix, self.next_task_number)
    }
}

/// Partial update of a project's editable metadata.
///
/// `None` leaves a field untouched. Values are expected to be normalized
/// already (see [`crate::validate`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub phase: Option<String>,
    pub address: Option<String>,
}

impl ProjectUpdate {
    /// True when no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.phase.is_none()
            && self.address.is_none()
    }

    /// Apply the update to an in-memory project.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            project.description = Some(description.clone());
        }
        if let Some(status) = &self.status {
            project.status.clone_from(status);
        }
        if let Some(phase) = &self.phase {
            project.phase.clone_from(phase);
        }
        if let Some(address) = &self.address {
            project.address = Some(address.clone());
        }
    }
}

/// First four alphanumerics of the name, upper-cased. Falls back to "PR".
fn derive_prefix(name: &str) -> String {
    let prefix = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(4)
        .collect::<String>()
        .to_uppercase();
    if prefix.is_empty() {
        "PR".to_string()
    } else {
        prefix
    }
}
