//! Task model.

use crate::validate::{normalize_priority, normalize_task_status};
use serde::{Deserialize, Serialize};

/// Task status values, matching the task board columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    TaskRedline,
    ProgressUpdate,
    DoneCompleted,
}

impl TaskStatus {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TaskRedline => "task_redline",
            Self::ProgressUpdate => "progress_update",
            Self::DoneCompleted => "done_completed",
        }
    }

    /// Parse a status or one of its synonyms.
    pub fn parse(s: &str) -> std::result::Result<Self, (String, Option<String>)> {
        Ok(match normalize_task_status(s)?.as_str() {
            "progress_update" => Self::ProgressUpdate,
            "done_completed" => Self::DoneCompleted,
            _ => Self::TaskRedline,
        })
    }
}

/// Task priority values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Parse a priority, synonym or P-notation value.
    pub fn parse(s: &str) -> std::result::Result<Self, (String, Option<String>)> {
        Ok(match normalize_priority(s)?.as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Medium,
        })
    }
}

/// A task on a project's board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (UUID format)
    pub id: String,

    /// Short ID for humans (e.g., "OAKS-3")
    pub short_id: String,

    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,

    /// Due date as `YYYY-MM-DD`
    pub due_date: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied when creating a task. The short ID is assigned on insert.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
}
