//! Tool dispatcher.
//!
//! Every call runs the same pipeline:
//!
//! 1. **validate** - ids must look like UUIDs, text must be non-blank,
//!    statuses/priorities/phases are normalized
//! 2. **resolve** - referenced rows must exist (not-found errors carry
//!    similar ids so a model can correct itself)
//! 3. **execute** - one `mutate()` transaction per mutating tool
//! 4. **audit** - events carry the actor, old/new snapshots and the tool name
//!
//! There are no retries and no idempotency keys: calling `create_task`
//! twice creates two tasks.

use super::search::{self, Document, DEFAULT_LIMIT};
use super::{CreateTaskArgs, ListTasksArgs, SearchArgs, ToolCall, UpdateProjectArgs, UpdateTaskStatusArgs, WriteNoteArgs};
use crate::arrangement::CANONICAL_FOLDERS;
use crate::error::{Error, Result};
use crate::model::{NewTask, Project, ProjectFile, ProjectUpdate, Task, TaskPriority, TaskStatus};
use crate::storage::events::EventType;
use crate::storage::sqlite::{
    find_folder_by_title, insert_file, insert_task, load_task, require_folder_in_project, set_task_status,
    update_project_fields,
};
use crate::storage::SqliteStorage;
use crate::validate::{
    find_similar_ids, invalid_value, normalize_phase, normalize_project_status, require_text, validate_identifier,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// Actor recorded for tool calls when none is given.
pub const AI_ACTOR: &str = "ai-assistant";

/// Folder a note lands in when the call names none.
const NOTE_FOLDER: &str = CANONICAL_FOLDERS[6];

/// Result of one tool call, as handed back to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutcome {
    pub tool: String,
    pub ok: bool,
    pub message: String,
    pub data: serde_json::Value,
}

impl ToolOutcome {
    fn success(tool: &str, message: String, data: serde_json::Value) -> Self {
        Self {
            tool: tool.to_string(),
            ok: true,
            message,
            data,
        }
    }

    /// Wrap an error in the structured shape a model can act on.
    #[must_use]
    pub fn failure(tool: &str, error: &Error) -> Self {
        Self {
            tool: tool.to_string(),
            ok: false,
            message: error.to_string(),
            data: error.to_structured_json(),
        }
    }
}

/// Runs tool calls against a storage handle as one actor.
pub struct ToolDispatcher<'a> {
    storage: &'a mut SqliteStorage,
    actor: String,
}

impl<'a> ToolDispatcher<'a> {
    #[must_use]
    pub fn new(storage: &'a mut SqliteStorage, actor: &str) -> Self {
        Self {
            storage,
            actor: actor.to_string(),
        }
    }

    #[must_use]
    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Parse and run a raw JSON call. Never fails; errors become outcomes.
    pub fn call_json(&mut self, raw: &str) -> ToolOutcome {
        match ToolCall::parse(raw) {
            Ok(call) => {
                let tool = call.name();
                self.call(call).unwrap_or_else(|e| ToolOutcome::failure(tool, &e))
            }
            Err(e) => {
                warn!(error = %e, "Rejected tool call payload");
                ToolOutcome::failure("unknown", &e)
            }
        }
    }

    /// Run a parsed call.
    ///
    /// # Errors
    ///
    /// Returns validation, not-found or database errors. Nothing is written
    /// when an error is returned.
    pub fn call(&mut self, call: ToolCall) -> Result<ToolOutcome> {
        let tool = call.name();
        debug!(tool, actor = %self.actor, "Dispatching tool call");

        let result = match call {
            ToolCall::CreateTask(args) => self.create_task(args),
            ToolCall::UpdateTaskStatus(args) => self.update_task_status(args),
            ToolCall::WriteNote(args) => self.write_note(args),
            ToolCall::UpdateProjectMetadata(args) => self.update_project_metadata(args),
            ToolCall::SearchSimilar(args) => self.search_similar(args),
            ToolCall::ListTasks(args) => self.list_tasks(args),
        };

        match &result {
            Ok(outcome) => info!(tool, actor = %self.actor, "{}", outcome.message),
            Err(e) => warn!(tool, actor = %self.actor, error = %e, "Tool call failed"),
        }
        result
    }

    // ── Resolution ────────────────────────────────────────────

    fn resolve_project(&self, field: &str, value: Option<&str>) -> Result<Project> {
        let id = validate_identifier(field, value.unwrap_or_default())?;
        if let Some(project) = self.storage.get_project(&id)? {
            return Ok(project);
        }
        let similar = find_similar_ids(&id, &self.storage.get_all_project_ids()?, 3);
        if similar.is_empty() {
            Err(Error::ProjectNotFound { id })
        } else {
            Err(Error::ProjectNotFoundSimilar { id, similar })
        }
    }

    fn resolve_task(&self, value: Option<&str>) -> Result<Task> {
        let id = validate_identifier("task_id", value.unwrap_or_default())?;
        if let Some(task) = load_task(self.storage.conn(), &id)? {
            return Ok(task);
        }
        let similar = find_similar_ids(&id, &self.storage.get_all_task_ids()?, 3);
        if similar.is_empty() {
            Err(Error::TaskNotFound { id })
        } else {
            Err(Error::TaskNotFoundSimilar { id, similar })
        }
    }

    // ── Mutating tools ────────────────────────────────────────

    fn create_task(&mut self, args: CreateTaskArgs) -> Result<ToolOutcome> {
        let project = self.resolve_project("project_id", args.project_id.as_deref())?;
        let title = require_text("title", args.title.as_deref())?;
        let priority = match args.priority.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => TaskPriority::parse(p).map_err(|e| invalid_value("priority", e))?,
            _ => TaskPriority::default(),
        };
        let due_date = args.due_date.as_deref().map(parse_due_date).transpose()?;
        let new = NewTask {
            title,
            description: args.description.filter(|d| !d.trim().is_empty()),
            priority,
            due_date,
        };

        let task = self.storage.mutate("create_task", &self.actor, |tx, ctx| {
            ctx.set_comment("create_task");
            insert_task(tx, ctx, &project.id, &new)
        })?;

        Ok(ToolOutcome::success(
            "create_task",
            format!("Created {} \"{}\" with {} priority", task.short_id, task.title, task.priority.as_str()),
            json!({ "task": task }),
        ))
    }

    fn update_task_status(&mut self, args: UpdateTaskStatusArgs) -> Result<ToolOutcome> {
        let raw_status = require_text("status", args.status.as_deref())?;
        let status = TaskStatus::parse(&raw_status).map_err(|e| invalid_value("status", e))?;
        let task = self.resolve_task(args.task_id.as_deref())?;

        let (old, new) = self.storage.mutate("update_task_status", &self.actor, |tx, ctx| {
            ctx.set_comment("update_task_status");
            set_task_status(tx, ctx, &task.id, status)
        })?;

        Ok(ToolOutcome::success(
            "update_task_status",
            format!("{} moved from {} to {}", new.short_id, old.status.as_str(), new.status.as_str()),
            json!({ "task": new, "previous_status": old.status }),
        ))
    }

    fn write_note(&mut self, args: WriteNoteArgs) -> Result<ToolOutcome> {
        let project = self.resolve_project("project_id", args.project_id.as_deref())?;
        let title = require_text("title", args.title.as_deref())?;
        let content = require_text("content", args.content.as_deref())?;
        let folder_id = args
            .folder_id
            .as_deref()
            .map(|id| validate_identifier("folder_id", id))
            .transpose()?;

        let folder = match folder_id {
            Some(id) => require_folder_in_project(self.storage.conn(), &id, &project.id)?,
            None => find_folder_by_title(self.storage.conn(), &project.id, NOTE_FOLDER)?.ok_or_else(|| {
                Error::FolderNotFound {
                    id: NOTE_FOLDER.to_string(),
                }
            })?,
        };

        let file = ProjectFile::new(&project.id, &folder.id, &note_file_name(&title)).with_content(content);
        self.storage.mutate("write_note", &self.actor, |tx, ctx| {
            ctx.set_comment("write_note");
            insert_file(tx, ctx, &file, EventType::NoteWritten)
        })?;

        Ok(ToolOutcome::success(
            "write_note",
            format!("Wrote {} to {}", file.name, folder.title),
            json!({ "file": file, "folder": folder.title }),
        ))
    }

    fn update_project_metadata(&mut self, args: UpdateProjectArgs) -> Result<ToolOutcome> {
        let project = self.resolve_project("project_id", args.project_id.as_deref())?;
        let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let update = ProjectUpdate {
            name: non_blank(args.name),
            description: non_blank(args.description),
            status: non_blank(args.status)
                .map(|s| normalize_project_status(&s).map_err(|e| invalid_value("project status", e)))
                .transpose()?,
            phase: non_blank(args.phase)
                .map(|p| normalize_phase(&p).map_err(|e| invalid_value("phase", e)))
                .transpose()?,
            address: non_blank(args.address),
        };
        if update.is_empty() {
            return Err(Error::RequiredField(
                "one of name, description, status, phase, address".to_string(),
            ));
        }

        let (old, new) = self.storage.mutate("update_project_metadata", &self.actor, |tx, ctx| {
            ctx.set_comment("update_project_metadata");
            update_project_fields(tx, ctx, &project.id, &update)
        })?;

        Ok(ToolOutcome::success(
            "update_project_metadata",
            format!("Updated {} ({}, {})", new.name, new.status, new.phase),
            json!({ "project": new, "previous": old }),
        ))
    }

    // ── Read-only tools ───────────────────────────────────────

    fn search_similar(&mut self, args: SearchArgs) -> Result<ToolOutcome> {
        let project = self.resolve_project("project_id", args.project_id.as_deref())?;
        let query = require_text("query", args.query.as_deref())?;
        let limit = args.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT);

        let tasks = self.storage.list_tasks(&project.id, None)?;
        let files = self.storage.list_files(&project.id)?;
        let documents = tasks
            .iter()
            .map(Document::from)
            .chain(files.iter().map(Document::from));
        let hits = search::rank(&query, documents, limit);

        Ok(ToolOutcome::success(
            "search_similar",
            format!("{} match(es) for \"{query}\"", hits.len()),
            json!({ "results": hits }),
        ))
    }

    fn list_tasks(&mut self, args: ListTasksArgs) -> Result<ToolOutcome> {
        let project = self.resolve_project("project_id", args.project_id.as_deref())?;
        let status = match args.status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(TaskStatus::parse(s).map_err(|e| invalid_value("status", e))?),
            _ => None,
        };
        let tasks = self.storage.list_tasks(&project.id, status)?;

        Ok(ToolOutcome::success(
            "list_tasks",
            format!("{} task(s) in {}", tasks.len(), project.name),
            json!({ "tasks": tasks, "count": tasks.len() }),
        ))
    }
}

/// Note title as a markdown file name.
fn note_file_name(title: &str) -> String {
    let title = title.trim();
    if title.to_ascii_lowercase().ends_with(".md") {
        title.to_string()
    } else {
        format!("{title}.md")
    }
}

/// Accept `YYYY-MM-DD` only.
pub(crate) fn parse_due_date(value: &str) -> Result<String> {
    let value = value.trim();
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| Error::InvalidArgument(format!("invalid due_date '{value}' (expected YYYY-MM-DD)")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn seeded() -> (SqliteStorage, Project) {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let project = Project::new("Oak Street".to_string());
        storage.create_project(&project, "setup").unwrap();
        (storage, project)
    }

    fn call(storage: &mut SqliteStorage, raw: serde_json::Value) -> ToolOutcome {
        ToolDispatcher::new(storage, AI_ACTOR).call_json(&raw.to_string())
    }

    #[test]
    fn test_create_task_is_audited_with_tool_comment() {
        let (mut storage, project) = seeded();
        let out = call(
            &mut storage,
            json!({"name": "create_task", "arguments": {"project_id": project.id, "title": "Order trusses", "priority": "p1"}}),
        );
        assert!(out.ok, "{out:?}");
        assert_eq!(out.data["task"]["priority"], "high");
        let task_id = out.data["task"]["id"].as_str().unwrap().to_string();

        let events = storage.get_events("task", &task_id, None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].actor, AI_ACTOR);
        assert_eq!(events[0].comment.as_deref(), Some("create_task"));
        assert!(events[0].old_value.is_none());
        assert!(events[0].new_value.is_some());
    }

    #[test]
    fn test_display_name_is_rejected_before_lookup() {
        let (mut storage, _) = seeded();
        let out = call(
            &mut storage,
            json!({"name": "create_task", "arguments": {"project_id": "Oak Street", "title": "x"}}),
        );
        assert!(!out.ok);
        assert_eq!(out.data["error"]["code"], ErrorCode::InvalidIdentifier.as_str());
        assert_eq!(out.data["error"]["retryable"], true);
        assert!(storage.list_recent_events(Some("task"), 10).unwrap().is_empty());
    }

    #[test]
    fn test_missing_project_suggests_similar_id() {
        let (mut storage, project) = seeded();
        let mut typo = project.id.clone();
        let last = if typo.ends_with('0') { "1" } else { "0" };
        typo.replace_range(35..36, last);

        let err = ToolDispatcher::new(&mut storage, AI_ACTOR)
            .call(
                ToolCall::from_parts("list_tasks", json!({"project_id": typo})).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::ProjectNotFoundSimilar { ref similar, .. } if similar == &vec![project.id.clone()]));
    }

    #[test]
    fn test_update_task_status_records_old_and_new() {
        let (mut storage, project) = seeded();
        let task = storage
            .create_task(&project.id, &NewTask { title: "Pour footings".into(), ..NewTask::default() }, "dana")
            .unwrap();

        let out = call(
            &mut storage,
            json!({"name": "update_task_status", "arguments": {"task_id": task.id, "status": "in_progress"}}),
        );
        assert!(out.ok, "{out:?}");
        assert_eq!(out.data["previous_status"], "task_redline");
        assert_eq!(out.data["task"]["status"], "progress_update");

        let events = storage.get_events("task", &task.id, None).unwrap();
        let change = events.iter().find(|e| e.comment.as_deref() == Some("update_task_status")).unwrap();
        assert!(change.old_value.as_deref().unwrap().contains("task_redline"));
        assert!(change.new_value.as_deref().unwrap().contains("progress_update"));
    }

    #[test]
    fn test_bad_status_writes_nothing() {
        let (mut storage, project) = seeded();
        let task = storage
            .create_task(&project.id, &NewTask { title: "Frame walls".into(), ..NewTask::default() }, "dana")
            .unwrap();
        let out = call(
            &mut storage,
            json!({"name": "update_task_status", "arguments": {"task_id": task.id, "status": "shipped"}}),
        );
        assert!(!out.ok);
        assert_eq!(storage.get_task(&task.id).unwrap().unwrap().status, TaskStatus::TaskRedline);
    }

    #[test]
    fn test_write_note_defaults_to_attachments() {
        let (mut storage, project) = seeded();
        let out = call(
            &mut storage,
            json!({"name": "write_note", "arguments": {"project_id": project.id, "title": "Site walk", "content": "North wall is out of plumb."}}),
        );
        assert!(out.ok, "{out:?}");
        assert_eq!(out.data["folder"], "Attachments");
        assert_eq!(out.data["file"]["name"], "Site walk.md");

        let file_id = out.data["file"]["id"].as_str().unwrap();
        let stored = storage.get_file(file_id).unwrap().unwrap();
        assert_eq!(stored.content.as_deref(), Some("North wall is out of plumb."));
        let events = storage.get_events("file", file_id, None).unwrap();
        assert_eq!(events[0].event_type, EventType::NoteWritten);
    }

    #[test]
    fn test_write_note_rejects_foreign_folder() {
        let (mut storage, project) = seeded();
        let other = Project::new("Birch Lane".to_string());
        let other_folders = storage.create_project(&other, "setup").unwrap();

        let out = call(
            &mut storage,
            json!({"name": "write_note", "arguments": {
                "project_id": project.id,
                "folder_id": other_folders[0].id,
                "title": "x",
                "content": "y"
            }}),
        );
        assert!(!out.ok);
        assert_eq!(out.data["error"]["code"], "FOLDER_NOT_FOUND");
    }

    #[test]
    fn test_update_project_metadata_normalizes() {
        let (mut storage, project) = seeded();
        let out = call(
            &mut storage,
            json!({"name": "update_project_metadata", "arguments": {"project_id": project.id, "status": "wip", "phase": "permit"}}),
        );
        assert!(out.ok, "{out:?}");
        let stored = storage.get_project(&project.id).unwrap().unwrap();
        assert_eq!(stored.status, "active");
        assert_eq!(stored.phase, "Permit");
        assert_eq!(out.data["previous"]["phase"], "Pre-Design");
    }

    #[test]
    fn test_update_project_metadata_requires_a_field() {
        let (mut storage, project) = seeded();
        let out = call(
            &mut storage,
            json!({"name": "update_project_metadata", "arguments": {"project_id": project.id, "name": "  "}}),
        );
        assert!(!out.ok);
        assert_eq!(out.data["error"]["code"], "REQUIRED_FIELD");
    }

    #[test]
    fn test_search_similar_finds_notes_and_tasks() {
        let (mut storage, project) = seeded();
        storage
            .create_task(&project.id, &NewTask { title: "Roof flashing detail".into(), ..NewTask::default() }, "dana")
            .unwrap();
        call(
            &mut storage,
            json!({"name": "write_note", "arguments": {"project_id": project.id, "title": "Roof", "content": "Flashing leaks at the chimney"}}),
        );

        let out = call(
            &mut storage,
            json!({"name": "search_similar", "arguments": {"project_id": project.id, "query": "roof flashing"}}),
        );
        assert!(out.ok);
        let results = out.data["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        let events_before = storage.list_recent_events(None, 100).unwrap().len();
        call(
            &mut storage,
            json!({"name": "list_tasks", "arguments": {"project_id": project.id}}),
        );
        assert_eq!(storage.list_recent_events(None, 100).unwrap().len(), events_before);
    }

    #[test]
    fn test_due_date_format() {
        assert_eq!(parse_due_date(" 2026-03-01 ").unwrap(), "2026-03-01");
        assert!(parse_due_date("03/01/2026").is_err());
        assert_eq!(note_file_name("minutes.MD"), "minutes.MD");
    }
}
