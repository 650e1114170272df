//! Audit event storage and retrieval.
//!
//! Every mutation writes its events in the same transaction as the change,
//! so the log never disagrees with the data.

use rusqlite::{Connection, Result};
use serde::Serialize;

/// Event types for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    // Project events
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,

    // Folder events
    FolderCreated,
    FolderRenamed,
    FolderReordered,
    FolderDeleted,

    // File events
    FileAdded,
    FileRenamed,
    FileMoved,
    FileDeleted,

    // Task events
    TaskCreated,
    TaskUpdated,
    TaskStatusChanged,

    // AI-written notes
    NoteWritten,

    /// Stored event type this build does not recognize.
    Unknown,
}

impl EventType {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectCreated => "project_created",
            Self::ProjectUpdated => "project_updated",
            Self::ProjectDeleted => "project_deleted",
            Self::FolderCreated => "folder_created",
            Self::FolderRenamed => "folder_renamed",
            Self::FolderReordered => "folder_reordered",
            Self::FolderDeleted => "folder_deleted",
            Self::FileAdded => "file_added",
            Self::FileRenamed => "file_renamed",
            Self::FileMoved => "file_moved",
            Self::FileDeleted => "file_deleted",
            Self::TaskCreated => "task_created",
            Self::TaskUpdated => "task_updated",
            Self::TaskStatusChanged => "task_status_changed",
            Self::NoteWritten => "note_written",
            Self::Unknown => "unknown",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "project_created" => Self::ProjectCreated,
            "project_updated" => Self::ProjectUpdated,
            "project_deleted" => Self::ProjectDeleted,
            "folder_created" => Self::FolderCreated,
            "folder_renamed" => Self::FolderRenamed,
            "folder_reordered" => Self::FolderReordered,
            "folder_deleted" => Self::FolderDeleted,
            "file_added" => Self::FileAdded,
            "file_renamed" => Self::FileRenamed,
            "file_moved" => Self::FileMoved,
            "file_deleted" => Self::FileDeleted,
            "task_created" => Self::TaskCreated,
            "task_updated" => Self::TaskUpdated,
            "task_status_changed" => Self::TaskStatusChanged,
            "note_written" => Self::NoteWritten,
            _ => Self::Unknown,
        }
    }
}

/// An audit event record.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub comment: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// Create a new event (id will be assigned by database).
    #[must_use]
    pub fn new(entity_type: &str, entity_id: &str, event_type: EventType, actor: &str) -> Self {
        Self {
            id: 0,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value: None,
            new_value: None,
            comment: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Add old/new values for field change tracking.
    #[must_use]
    pub fn with_values(mut self, old: Option<String>, new: Option<String>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Add a comment to the event.
    #[must_use]
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Insert an event into the database.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            event.entity_type,
            event.entity_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.comment,
            event.created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const EVENT_COLUMNS: &str =
    "id, entity_type, entity_id, event_type, actor, old_value, new_value, comment, created_at";

/// Get events for an entity, newest first.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_events(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
    limit: Option<u32>,
) -> Result<Vec<Event>> {
    let limit = limit.unwrap_or(100);
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY created_at DESC, id DESC
         LIMIT ?3"
    ))?;

    let rows = stmt.query_map(rusqlite::params![entity_type, entity_id, limit], map_event_row)?;
    rows.collect()
}

/// List the most recent events, optionally narrowed to one entity type.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn list_recent_events(
    conn: &Connection,
    entity_type: Option<&str>,
    limit: u32,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events
         WHERE ?1 IS NULL OR entity_type = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;

    let rows = stmt.query_map(rusqlite::params![entity_type, limit], map_event_row)?;
    rows.collect()
}

fn map_event_row(row: &rusqlite::Row) -> Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        event_type: EventType::parse(row.get::<_, String>(3)?.as_str()),
        actor: row.get(4)?,
        old_value: row.get(5)?,
        new_value: row.get(6)?,
        comment: row.get(7)?,
        created_at: row.get(8)?,
    })
}
