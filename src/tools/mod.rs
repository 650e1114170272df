//! AI tool calls against the project data model.
//!
//! A language model names a tool and hands over JSON arguments. Nothing it
//! sends is trusted: every id is checked for shape and existence before a
//! mutation runs, and every mutation is written to the audit log with the
//! tool name as its comment.
//!
//! # Submodules
//!
//! - [`dispatch`] - Validate → resolve → execute → audit pipeline
//! - [`search`] - Term-frequency similarity search

pub mod dispatch;
pub mod search;

pub use dispatch::{ToolDispatcher, ToolOutcome, AI_ACTOR};

use crate::error::{Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Names of every supported tool, in the order they are documented.
pub const TOOL_NAMES: [&str; 6] = [
    "create_task",
    "update_task_status",
    "write_note",
    "update_project_metadata",
    "search_similar",
    "list_tasks",
];

/// One-line description per tool for `planroom tool list`.
#[must_use]
pub fn describe(name: &str) -> &'static str {
    match name {
        "create_task" => "Create a task in a project (project_id, title, priority?, description?, due_date?)",
        "update_task_status" => "Change a task's status (task_id, status)",
        "write_note" => "Write a markdown note into a folder (project_id, title, content, folder_id?)",
        "update_project_metadata" => {
            "Update a project's name, description, status, phase or address (project_id, ...)"
        }
        "search_similar" => "Find tasks, notes and files similar to a query (project_id, query, limit?)",
        "list_tasks" => "List a project's tasks (project_id, status?)",
        _ => "",
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTaskArgs {
    pub project_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTaskStatusArgs {
    pub task_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WriteNoteArgs {
    pub project_id: Option<String>,
    pub folder_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProjectArgs {
    pub project_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub phase: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchArgs {
    pub project_id: Option<String>,
    pub query: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ListTasksArgs {
    pub project_id: Option<String>,
    pub status: Option<String>,
}

/// A parsed tool call.
#[derive(Debug, Clone)]
pub enum ToolCall {
    CreateTask(CreateTaskArgs),
    UpdateTaskStatus(UpdateTaskStatusArgs),
    WriteNote(WriteNoteArgs),
    UpdateProjectMetadata(UpdateProjectArgs),
    SearchSimilar(SearchArgs),
    ListTasks(ListTasksArgs),
}

/// Wire shape: `{"name": "...", "arguments": {...}}`.
///
/// `arguments` may also arrive as a JSON-encoded string.
#[derive(Debug, Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

impl ToolCall {
    /// Parse a tool call from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Json` for malformed payloads and `UnknownTool` for a name
    /// outside [`TOOL_NAMES`].
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawToolCall = serde_json::from_str(json)?;
        Self::from_parts(&raw.name, raw.arguments)
    }

    /// Build a tool call from a name and its arguments.
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool` or a JSON error for mistyped arguments.
    pub fn from_parts(name: &str, arguments: serde_json::Value) -> Result<Self> {
        let arguments = match arguments {
            serde_json::Value::String(text) if text.trim().is_empty() => serde_json::Value::Null,
            serde_json::Value::String(text) => serde_json::from_str(&text)?,
            other => other,
        };

        Ok(match name.trim() {
            "create_task" => Self::CreateTask(args(arguments)?),
            "update_task_status" => Self::UpdateTaskStatus(args(arguments)?),
            "write_note" => Self::WriteNote(args(arguments)?),
            "update_project_metadata" | "update_project_status" => Self::UpdateProjectMetadata(args(arguments)?),
            "search_similar" => Self::SearchSimilar(args(arguments)?),
            "list_tasks" => Self::ListTasks(args(arguments)?),
            other => return Err(Error::UnknownTool(other.to_string())),
        })
    }

    /// Canonical tool name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateTask(_) => "create_task",
            Self::UpdateTaskStatus(_) => "update_task_status",
            Self::WriteNote(_) => "write_note",
            Self::UpdateProjectMetadata(_) => "update_project_metadata",
            Self::SearchSimilar(_) => "search_similar",
            Self::ListTasks(_) => "list_tasks",
        }
    }

    /// Whether the tool writes to the store.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::SearchSimilar(_) | Self::ListTasks(_))
    }
}

fn args<T: DeserializeOwned + Default>(value: serde_json::Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_arguments() {
        let call = ToolCall::parse(r#"{"name":"create_task","arguments":{"project_id":"p","title":"Order trusses"}}"#)
            .unwrap();
        let ToolCall::CreateTask(args) = call else {
            panic!("expected create_task");
        };
        assert_eq!(args.title.as_deref(), Some("Order trusses"));
        assert!(args.priority.is_none());
    }

    #[test]
    fn test_parse_string_arguments() {
        let call = ToolCall::parse(r#"{"name":"list_tasks","arguments":"{\"project_id\":\"p\"}"}"#).unwrap();
        assert_eq!(call.name(), "list_tasks");
        assert!(!call.is_mutation());
    }

    #[test]
    fn test_legacy_project_status_name() {
        let call = ToolCall::parse(r#"{"name":"update_project_status","arguments":{"status":"active"}}"#).unwrap();
        assert_eq!(call.name(), "update_project_metadata");
    }

    #[test]
    fn test_unknown_tool() {
        let err = ToolCall::parse(r#"{"name":"drop_tables","arguments":{}}"#).unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "drop_tables"));
    }

    #[test]
    fn test_missing_arguments_default() {
        let call = ToolCall::parse(r#"{"name":"search_similar"}"#).unwrap();
        let ToolCall::SearchSimilar(args) = call else {
            panic!("expected search_similar");
        };
        assert!(args.query.is_none());
    }

    #[test]
    fn test_every_tool_is_described() {
        assert!(TOOL_NAMES.iter().all(|name| !describe(name).is_empty()));
    }
}
