//! SQLite storage implementation.
//!
//! This module provides the storage backend for Planroom using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.
//!
//! Row-level helpers (`insert_task`, `update_project_fields`, ...) take the
//! open transaction and the context so the tool dispatcher can compose
//! several of them inside a single `mutate()` call.

use crate::arrangement::CANONICAL_FOLDERS;
use crate::error::{Error, Result};
use crate::model::{
    Folder, NewTask, Project, ProjectFile, ProjectUpdate, Task, TaskPriority, TaskStatus,
};
use crate::storage::events::{self, insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use rusqlite::{Connection, OptionalExtension, Transaction};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

/// Context for a mutation operation, tracking side effects.
///
/// Passed to mutation closures to record audit events; the events are
/// written just before the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (user name, `ai-assistant`, ...).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
    /// Comment stamped on every event that has none of its own.
    pub comment: Option<String>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
            comment: None,
        }
    }

    /// Record an event for this operation.
    pub fn record_event(&mut self, entity_type: &str, entity_id: &str, event_type: EventType) {
        self.events
            .push(Event::new(entity_type, entity_id, event_type, &self.actor));
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events.push(
            Event::new(entity_type, entity_id, event_type, &self.actor)
                .with_values(old_value, new_value),
        );
    }

    /// Set the comment applied to this operation's events.
    pub fn set_comment(&mut self, comment: &str) {
        self.comment = Some(comment.to_string());
    }
}

/// JSON snapshot of an entity for the audit log.
pub(crate) fn snapshot<T: Serialize>(value: &T) -> Option<String> {
    serde_json::to_string(value).ok()
}

const PROJECT_COLUMNS: &str =
    "id, name, description, status, phase, address, task_prefix, next_task_number, created_at, updated_at";
const FOLDER_COLUMNS: &str = "id, project_id, title, sort_order, created_at, updated_at";
const FILE_COLUMNS: &str = "id, project_id, folder_id, name, storage_path, mimetype, size, checksum, content, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, short_id, project_id, title, description, status, priority, due_date, created_at, updated_at";

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(timeout_ms.map_or(Duration::from_secs(5), Duration::from_millis))?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, actor: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, actor);
        let result = f(&tx, &mut ctx)?;

        for event in &mut ctx.events {
            if event.comment.is_none() {
                event.comment.clone_from(&ctx.comment);
            }
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op, actor, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    // ==================
    // Project Operations
    // ==================

    /// Create a new project and seed its canonical folders.
    ///
    /// Returns the seeded folders in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the project already exists or the insert fails.
    pub fn create_project(&mut self, project: &Project, actor: &str) -> Result<Vec<Folder>> {
        self.mutate("create_project", actor, |tx, ctx| {
            tx.execute(
                &format!(
                    "INSERT INTO projects ({PROJECT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                rusqlite::params![
                    project.id,
                    project.name,
                    project.description,
                    project.status,
                    project.phase,
                    project.address,
                    project.task_prefix,
                    project.next_task_number,
                    project.created_at,
                    project.updated_at,
                ],
            )?;
            ctx.record_change("project", &project.id, EventType::ProjectCreated, None, snapshot(project));

            let mut folders = Vec::with_capacity(CANONICAL_FOLDERS.len());
            for title in CANONICAL_FOLDERS {
                let folder = Folder::new(&project.id, title);
                insert_folder(tx, ctx, &folder)?;
                folders.push(folder);
            }
            Ok(folders)
        })
    }

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_project(&self, id: &str) -> Result<Option<Project>> {
        load_project(&self.conn, id)
    }

    /// List projects, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_projects(&self, limit: usize) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY updated_at DESC LIMIT ?1"
        ))?;
        let projects = stmt
            .query_map([limit], map_project_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// All project IDs, for "did you mean" suggestions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all_project_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM projects")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Update a project's metadata and return the new state.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or the update fails.
    pub fn update_project(&mut self, id: &str, update: &ProjectUpdate, actor: &str) -> Result<Project> {
        self.mutate("update_project", actor, |tx, ctx| {
            update_project_fields(tx, ctx, id, update).map(|(_, new)| new)
        })
    }

    /// Delete a project and everything it owns.
    ///
    /// Folders, files and tasks go with it through foreign key cascades.
    ///
    /// # Errors
    ///
    /// Returns an error if the project doesn't exist or deletion fails.
    pub fn delete_project(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_project", actor, |tx, ctx| {
            let old = load_project(tx, id)?.ok_or_else(|| Error::ProjectNotFound { id: id.to_string() })?;
            tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
            ctx.record_change("project", id, EventType::ProjectDeleted, snapshot(&old), None);
            Ok(())
        })
    }

    // =================
    // Folder Operations
    // =================

    /// Folders of a project in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_folders(&self, project_id: &str) -> Result<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE project_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let folders = stmt
            .query_map([project_id], map_folder_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(folders)
    }

    /// Get a folder by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_folder(&self, id: &str) -> Result<Option<Folder>> {
        load_folder(&self.conn, id)
    }

    /// Create a folder at the end of a project's folder list.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project doesn't exist.
    pub fn create_folder(&mut self, project_id: &str, title: &str, actor: &str) -> Result<Folder> {
        self.mutate("create_folder", actor, |tx, ctx| {
            require_project(tx, project_id)?;
            let folder = Folder::new(project_id, title);
            insert_folder(tx, ctx, &folder)?;
            Ok(folder)
        })
    }

    /// Rename a folder.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder doesn't exist.
    pub fn rename_folder(&mut self, id: &str, title: &str, actor: &str) -> Result<Folder> {
        self.mutate("rename_folder", actor, |tx, ctx| {
            let old = require_folder(tx, id)?;
            let now = chrono::Utc::now().timestamp_millis();
            tx.execute(
                "UPDATE folders SET title = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![title, now, id],
            )?;
            ctx.record_change(
                "folder",
                id,
                EventType::FolderRenamed,
                Some(old.title.clone()),
                Some(title.to_string()),
            );
            Ok(Folder {
                title: title.to_string(),
                updated_at: now,
                ..old
            })
        })
    }

    /// Record the index a folder was dragged to.
    ///
    /// The list fetch keeps ordering by creation; this column is only
    /// informational.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder doesn't exist.
    pub fn reorder_folder(&mut self, id: &str, index: usize, actor: &str) -> Result<()> {
        let index = i64::try_from(index).map_err(|_| Error::InvalidArgument(format!("index {index} out of range")))?;
        self.mutate("reorder_folder", actor, |tx, ctx| {
            let old = require_folder(tx, id)?;
            tx.execute(
                "UPDATE folders SET sort_order = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![index, chrono::Utc::now().timestamp_millis(), id],
            )?;
            ctx.record_change(
                "folder",
                id,
                EventType::FolderReordered,
                old.sort_order.map(|i| i.to_string()),
                Some(index.to_string()),
            );
            Ok(())
        })
    }

    /// Delete a folder together with its files.
    ///
    /// Returns the number of files that went with it.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder doesn't exist.
    pub fn delete_folder(&mut self, id: &str, actor: &str) -> Result<usize> {
        self.mutate("delete_folder", actor, |tx, ctx| {
            let old = require_folder(tx, id)?;
            let files: usize = tx.query_row(
                "SELECT COUNT(*) FROM files WHERE folder_id = ?1",
                [id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM folders WHERE id = ?1", [id])?;
            ctx.record_change("folder", id, EventType::FolderDeleted, snapshot(&old), None);
            Ok(files)
        })
    }

    /// Find a folder of a project by exact title.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_folder_by_title(&self, project_id: &str, title: &str) -> Result<Option<Folder>> {
        find_folder_by_title(&self.conn, project_id, title)
    }

    // ===============
    // File Operations
    // ===============

    /// Files of a project in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_files(&self, project_id: &str) -> Result<Vec<ProjectFile>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE project_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let files = stmt
            .query_map([project_id], map_file_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Get a file by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_file(&self, id: &str) -> Result<Option<ProjectFile>> {
        load_file(&self.conn, id)
    }

    /// Record an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns `FolderNotFound` if the folder is missing or belongs to
    /// another project.
    pub fn add_file(&mut self, file: &ProjectFile, actor: &str) -> Result<()> {
        self.mutate("add_file", actor, |tx, ctx| {
            require_folder_in_project(tx, &file.folder_id, &file.project_id)?;
            insert_file(tx, ctx, file, EventType::FileAdded)
        })
    }

    /// Rename a file.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file doesn't exist.
    pub fn rename_file(&mut self, id: &str, name: &str, actor: &str) -> Result<()> {
        self.mutate("rename_file", actor, |tx, ctx| {
            let old = require_file(tx, id)?;
            tx.execute(
                "UPDATE files SET name = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![name, chrono::Utc::now().timestamp_millis(), id],
            )?;
            ctx.record_change("file", id, EventType::FileRenamed, Some(old.name), Some(name.to_string()));
            Ok(())
        })
    }

    /// Reassign a file to another folder of the same project.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` or `FolderNotFound`.
    pub fn move_file(&mut self, id: &str, folder_id: &str, actor: &str) -> Result<()> {
        self.mutate("move_file", actor, |tx, ctx| {
            let old = require_file(tx, id)?;
            require_folder_in_project(tx, folder_id, &old.project_id)?;
            tx.execute(
                "UPDATE files SET folder_id = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![folder_id, chrono::Utc::now().timestamp_millis(), id],
            )?;
            ctx.record_change(
                "file",
                id,
                EventType::FileMoved,
                Some(old.folder_id),
                Some(folder_id.to_string()),
            );
            Ok(())
        })
    }

    /// Delete a file.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file doesn't exist.
    pub fn delete_file(&mut self, id: &str, actor: &str) -> Result<()> {
        self.mutate("delete_file", actor, |tx, ctx| {
            let old = require_file(tx, id)?;
            tx.execute("DELETE FROM files WHERE id = ?1", [id])?;
            ctx.record_change("file", id, EventType::FileDeleted, snapshot(&old), None);
            Ok(())
        })
    }

    // ===============
    // Task Operations
    // ===============

    /// Create a task, assigning the project's next short ID.
    ///
    /// # Errors
    ///
    /// Returns `ProjectNotFound` if the project doesn't exist.
    pub fn create_task(&mut self, project_id: &str, new: &NewTask, actor: &str) -> Result<Task> {
        self.mutate("create_task", actor, |tx, ctx| insert_task(tx, ctx, project_id, new))
    }

    /// Get a task by UUID or short ID (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        load_task(&self.conn, id)
    }

    /// Tasks of a project in creation order, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_tasks(&self, project_id: &str, status: Option<TaskStatus>) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE project_id = ?1 AND (?2 IS NULL OR status = ?2)
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let tasks = stmt
            .query_map(
                rusqlite::params![project_id, status.map(|s| s.as_str())],
                map_task_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Move a task to another board column.
    ///
    /// # Errors
    ///
    /// Returns `TaskNotFound` if the task doesn't exist.
    pub fn update_task_status(&mut self, id: &str, status: TaskStatus, actor: &str) -> Result<Task> {
        self.mutate("update_task_status", actor, |tx, ctx| {
            set_task_status(tx, ctx, id, status).map(|(_, new)| new)
        })
    }

    /// All task IDs and short IDs, for "did you mean" suggestions.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_all_task_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT id, short_id FROM tasks")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().flat_map(|(id, short)| [id, short]).collect())
    }

    // ======
    // Events
    // ======

    /// Audit events for one entity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_events(&self, entity_type: &str, entity_id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
        Ok(events::get_events(&self.conn, entity_type, entity_id, limit)?)
    }

    /// Most recent audit events, optionally narrowed to one entity type.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_recent_events(&self, entity_type: Option<&str>, limit: u32) -> Result<Vec<Event>> {
        Ok(events::list_recent_events(&self.conn, entity_type, limit)?)
    }
}

// =====================
// Row-level operations
// =====================

pub(crate) fn load_project(conn: &Connection, id: &str) -> Result<Option<Project>> {
    Ok(conn
        .query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            [id],
            map_project_row,
        )
        .optional()?)
}

pub(crate) fn require_project(conn: &Connection, id: &str) -> Result<Project> {
    load_project(conn, id)?.ok_or_else(|| Error::ProjectNotFound { id: id.to_string() })
}

/// Apply a metadata update, returning the old and new project.
pub(crate) fn update_project_fields(
    tx: &Transaction,
    ctx: &mut MutationContext,
    id: &str,
    update: &ProjectUpdate,
) -> Result<(Project, Project)> {
    let old = require_project(tx, id)?;
    let mut new = old.clone();
    update.apply_to(&mut new);
    new.updated_at = chrono::Utc::now().timestamp_millis();

    tx.execute(
        "UPDATE projects
         SET name = ?1, description = ?2, status = ?3, phase = ?4, address = ?5, updated_at = ?6
         WHERE id = ?7",
        rusqlite::params![
            new.name,
            new.description,
            new.status,
            new.phase,
            new.address,
            new.updated_at,
            id,
        ],
    )?;

    ctx.record_change("project", id, EventType::ProjectUpdated, snapshot(&old), snapshot(&new));
    Ok((old, new))
}

pub(crate) fn load_folder(conn: &Connection, id: &str) -> Result<Option<Folder>> {
    Ok(conn
        .query_row(
            &format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?1"),
            [id],
            map_folder_row,
        )
        .optional()?)
}

fn require_folder(conn: &Connection, id: &str) -> Result<Folder> {
    load_folder(conn, id)?.ok_or_else(|| Error::FolderNotFound { id: id.to_string() })
}

/// A folder that exists and belongs to `project_id`.
pub(crate) fn require_folder_in_project(conn: &Connection, folder_id: &str, project_id: &str) -> Result<Folder> {
    match load_folder(conn, folder_id)? {
        Some(folder) if folder.project_id == project_id => Ok(folder),
        _ => Err(Error::FolderNotFound {
            id: folder_id.to_string(),
        }),
    }
}

pub(crate) fn find_folder_by_title(conn: &Connection, project_id: &str, title: &str) -> Result<Option<Folder>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {FOLDER_COLUMNS} FROM folders
                 WHERE project_id = ?1 AND title = ?2
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT 1"
            ),
            [project_id, title],
            map_folder_row,
        )
        .optional()?)
}

fn insert_folder(tx: &Transaction, ctx: &mut MutationContext, folder: &Folder) -> Result<()> {
    tx.execute(
        &format!("INSERT INTO folders ({FOLDER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        rusqlite::params![
            folder.id,
            folder.project_id,
            folder.title,
            folder.sort_order,
            folder.created_at,
            folder.updated_at,
        ],
    )?;
    ctx.record_change("folder", &folder.id, EventType::FolderCreated, None, Some(folder.title.clone()));
    Ok(())
}

fn load_file(conn: &Connection, id: &str) -> Result<Option<ProjectFile>> {
    Ok(conn
        .query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1"),
            [id],
            map_file_row,
        )
        .optional()?)
}

fn require_file(conn: &Connection, id: &str) -> Result<ProjectFile> {
    load_file(conn, id)?.ok_or_else(|| Error::FileNotFound { id: id.to_string() })
}

/// Insert a file row and record `event_type` for it.
pub(crate) fn insert_file(
    tx: &Transaction,
    ctx: &mut MutationContext,
    file: &ProjectFile,
    event_type: EventType,
) -> Result<()> {
    tx.execute(
        &format!(
            "INSERT INTO files ({FILE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        rusqlite::params![
            file.id,
            file.project_id,
            file.folder_id,
            file.name,
            file.storage_path,
            file.mimetype,
            file.size,
            file.checksum,
            file.content,
            file.created_at,
            file.updated_at,
        ],
    )?;
    ctx.record_change("file", &file.id, event_type, None, snapshot(file));
    Ok(())
}

pub(crate) fn load_task(conn: &Connection, id: &str) -> Result<Option<Task>> {
    Ok(conn
        .query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 OR short_id = upper(?1)"),
            [id],
            map_task_row,
        )
        .optional()?)
}

/// Insert a task with the project's next short ID.
pub(crate) fn insert_task(
    tx: &Transaction,
    ctx: &mut MutationContext,
    project_id: &str,
    new: &NewTask,
) -> Result<Task> {
    let project = require_project(tx, project_id)?;
    let short_id = project.next_task_short_id();
    tx.execute(
        "UPDATE projects SET next_task_number = next_task_number + 1 WHERE id = ?1",
        [project_id],
    )?;

    let now = chrono::Utc::now().timestamp_millis();
    let task = Task {
        id: uuid::Uuid::new_v4().to_string(),
        short_id,
        project_id: project_id.to_string(),
        title: new.title.clone(),
        description: new.description.clone(),
        status: TaskStatus::default(),
        priority: new.priority,
        due_date: new.due_date.clone(),
        created_at: now,
        updated_at: now,
    };

    tx.execute(
        &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        rusqlite::params![
            task.id,
            task.short_id,
            task.project_id,
            task.title,
            task.description,
            task.status.as_str(),
            task.priority.as_str(),
            task.due_date,
            task.created_at,
            task.updated_at,
        ],
    )?;

    ctx.record_change("task", &task.id, EventType::TaskCreated, None, snapshot(&task));
    Ok(task)
}

/// Change a task's status, returning the old and new task.
pub(crate) fn set_task_status(
    tx: &Transaction,
    ctx: &mut MutationContext,
    id: &str,
    status: TaskStatus,
) -> Result<(Task, Task)> {
    let old = load_task(tx, id)?.ok_or_else(|| Error::TaskNotFound { id: id.to_string() })?;
    let new = Task {
        status,
        updated_at: chrono::Utc::now().timestamp_millis(),
        ..old.clone()
    };

    tx.execute(
        "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![new.status.as_str(), new.updated_at, new.id],
    )?;

    ctx.record_change("task", &new.id, EventType::TaskStatusChanged, snapshot(&old), snapshot(&new));
    Ok((old, new))
}

// ===========
// Row mappers
// ===========

fn map_project_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        phase: row.get(4)?,
        address: row.get(5)?,
        task_prefix: row.get(6)?,
        next_task_number: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn map_folder_row(row: &rusqlite::Row) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        project_id: row.get(1)?,
        title: row.get(2)?,
        sort_order: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn map_file_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectFile> {
    Ok(ProjectFile {
        id: row.get(0)?,
        project_id: row.get(1)?,
        folder_id: row.get(2)?,
        name: row.get(3)?,
        storage_path: row.get(4)?,
        mimetype: row.get(5)?,
        size: row.get(6)?,
        checksum: row.get(7)?,
        content: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn map_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    let status: String = row.get(5)?;
    let priority: String = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        short_id: row.get(1)?,
        project_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: TaskStatus::parse(&status).unwrap_or_default(),
        priority: TaskPriority::parse(&priority).unwrap_or_default(),
        due_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_with_project() -> (SqliteStorage, Project, Vec<Folder>) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("Oak Street".to_string());
        let folders = storage.create_project(&project, "tester").unwrap();
        (storage, project, folders)
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..NewTask::default()
        }
    }

    #[test]
    fn test_create_project_seeds_canonical_folders() {
        let (storage, project, seeded) = storage_with_project();
        let folders = storage.list_folders(&project.id).unwrap();
        let titles: Vec<&str> = folders.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, CANONICAL_FOLDERS);
        assert_eq!(folders, seeded);
    }

    #[test]
    fn test_task_short_ids_increment() {
        let (mut storage, project, _) = storage_with_project();
        let first = storage.create_task(&project.id, &new_task("Survey"), "tester").unwrap();
        let second = storage.create_task(&project.id, &new_task("Frame"), "tester").unwrap();
        assert_eq!(first.short_id, "OAKS-1");
        assert_eq!(second.short_id, "OAKS-2");
        assert_eq!(first.status, TaskStatus::TaskRedline);

        let by_short = storage.get_task("oaks-2").unwrap().unwrap();
        assert_eq!(by_short.id, second.id);
    }

    #[test]
    fn test_status_change_records_old_and_new() {
        let (mut storage, project, _) = storage_with_project();
        let task = storage.create_task(&project.id, &new_task("Pour"), "tester").unwrap();
        let updated = storage
            .update_task_status(&task.id, TaskStatus::DoneCompleted, "tester")
            .unwrap();
        assert_eq!(updated.status, TaskStatus::DoneCompleted);

        let events = storage.get_events("task", &task.id, None).unwrap();
        let change = events
            .iter()
            .find(|e| e.event_type == EventType::TaskStatusChanged)
            .unwrap();
        assert!(change.old_value.as_deref().unwrap().contains("task_redline"));
        assert!(change.new_value.as_deref().unwrap().contains("done_completed"));
    }

    #[test]
    fn test_failed_mutation_writes_nothing() {
        let (mut storage, project, _) = storage_with_project();
        let before = storage.list_recent_events(None, 1000).unwrap().len();

        let result: Result<()> = storage.mutate("doomed", "tester", |tx, ctx| {
            insert_task(tx, ctx, &project.id, &new_task("Temp"))?;
            Err(Error::Other("abort".to_string()))
        });
        assert!(result.is_err());

        assert!(storage.list_tasks(&project.id, None).unwrap().is_empty());
        assert_eq!(storage.list_recent_events(None, 1000).unwrap().len(), before);
    }

    #[test]
    fn test_context_comment_is_stamped_on_events() {
        let (mut storage, project, _) = storage_with_project();
        let task = storage
            .mutate("create_task", "ai-assistant", |tx, ctx| {
                ctx.set_comment("create_task");
                insert_task(tx, ctx, &project.id, &new_task("Order windows"))
            })
            .unwrap();
        let events = storage.get_events("task", &task.id, None).unwrap();
        assert_eq!(events[0].comment.as_deref(), Some("create_task"));
        assert_eq!(events[0].actor, "ai-assistant");
    }

    #[test]
    fn test_move_file_rejects_foreign_folder() {
        let (mut storage, project, folders) = storage_with_project();
        let other = Project::new("Elm".to_string());
        let other_folders = storage.create_project(&other, "tester").unwrap();

        let file = ProjectFile::new(&project.id, &folders[0].id, "A-101.pdf");
        storage.add_file(&file, "tester").unwrap();

        let err = storage
            .move_file(&file.id, &other_folders[0].id, "tester")
            .unwrap_err();
        assert!(matches!(err, Error::FolderNotFound { .. }));

        storage.move_file(&file.id, &folders[4].id, "tester").unwrap();
        assert_eq!(storage.get_file(&file.id).unwrap().unwrap().folder_id, folders[4].id);
    }

    #[test]
    fn test_delete_folder_removes_its_files() {
        let (mut storage, project, folders) = storage_with_project();
        storage
            .add_file(&ProjectFile::new(&project.id, &folders[5].id, "site.jpg"), "tester")
            .unwrap();
        let removed = storage.delete_folder(&folders[5].id, "tester").unwrap();
        assert_eq!(removed, 1);
        assert!(storage.list_files(&project.id).unwrap().is_empty());
        assert_eq!(storage.list_folders(&project.id).unwrap().len(), 6);
    }

    #[test]
    fn test_reorder_does_not_change_fetch_order() {
        let (mut storage, project, folders) = storage_with_project();
        storage.reorder_folder(&folders[6].id, 0, "tester").unwrap();
        let fetched = storage.list_folders(&project.id).unwrap();
        assert_eq!(fetched[6].id, folders[6].id);
        assert_eq!(fetched[6].sort_order, Some(0));
    }

    #[test]
    fn test_update_project_fields() {
        let (mut storage, project, _) = storage_with_project();
        let update = ProjectUpdate {
            status: Some("active".to_string()),
            address: Some("12 Oak St".to_string()),
            ..ProjectUpdate::default()
        };
        let updated = storage.update_project(&project.id, &update, "tester").unwrap();
        assert_eq!(updated.status, "active");
        assert_eq!(updated.phase, "Pre-Design");

        let missing = storage.update_project("nope", &update, "tester");
        assert!(matches!(missing, Err(Error::ProjectNotFound { .. })));
    }

    #[test]
    fn test_delete_project_cascades() {
        let (mut storage, project, _) = storage_with_project();
        storage.create_task(&project.id, &new_task("Demo"), "tester").unwrap();
        storage.delete_project(&project.id, "tester").unwrap();
        assert!(storage.get_project(&project.id).unwrap().is_none());
        assert!(storage.list_folders(&project.id).unwrap().is_empty());
        assert!(storage.list_tasks(&project.id, None).unwrap().is_empty());
    }
}
