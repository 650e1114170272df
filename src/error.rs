//! Error types for Planroom.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Retryability flags so a tool-calling model can correct its arguments
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Planroom operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Models match on the string; shell scripts on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ProjectNotFound,
    FolderNotFound,
    FileNotFound,
    TaskNotFound,

    // Validation (exit 4)
    InvalidIdentifier,
    InvalidArgument,
    RequiredField,
    UnknownTool,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::FolderNotFound => "FOLDER_NOT_FOUND",
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::TaskNotFound => "TASK_NOT_FOUND",
            Self::InvalidIdentifier => "INVALID_IDENTIFIER",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::UnknownTool => "UNKNOWN_TOOL",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ProjectNotFound | Self::FolderNotFound | Self::FileNotFound | Self::TaskNotFound => 3,
            Self::InvalidIdentifier
            | Self::InvalidArgument
            | Self::RequiredField
            | Self::UnknownTool => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether a caller should retry with corrected input.
    ///
    /// True for validation errors. False for not-found, I/O, or internal errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier
                | Self::InvalidArgument
                | Self::RequiredField
                | Self::UnknownTool
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Planroom operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `planroom init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Project not found: {id} (did you mean: {}?)", similar.join(", "))]
    ProjectNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Folder not found: {id}")]
    FolderNotFound { id: String },

    #[error("File not found: {id}")]
    FileNotFound { id: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: String },

    #[error("Task not found: {id} (did you mean: {}?)", similar.join(", "))]
    TaskNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Invalid identifier for '{field}': {reason}")]
    InvalidIdentifier {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {0}")]
    RequiredField(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::ProjectNotFound { .. } | Self::ProjectNotFoundSimilar { .. } => {
                ErrorCode::ProjectNotFound
            }
            Self::FolderNotFound { .. } => ErrorCode::FolderNotFound,
            Self::FileNotFound { .. } => ErrorCode::FileNotFound,
            Self::TaskNotFound { .. } | Self::TaskNotFoundSimilar { .. } => ErrorCode::TaskNotFound,
            Self::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifier,
            Self::RequiredField(_) => ErrorCode::RequiredField,
            Self::UnknownTool(_) => ErrorCode::UnknownTool,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for models and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `planroom init` to initialize the database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ProjectNotFound { id } => Some(format!(
                "No project with ID '{id}'. Use `planroom project list` to see available projects."
            )),
            Self::ProjectNotFoundSimilar { similar, .. }
            | Self::TaskNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::FolderNotFound { .. } => Some(
                "Use `planroom folder list <project>` to see folder IDs.".to_string(),
            ),
            Self::FileNotFound { .. } => {
                Some("Use `planroom file list <project>` to see file IDs.".to_string())
            }
            Self::TaskNotFound { id } => Some(format!(
                "No task with ID '{id}'. Use `planroom task list <project>` to see tasks."
            )),

            Self::InvalidIdentifier { value, .. } => {
                if value.chars().any(char::is_whitespace) {
                    Some(
                        "Pass the entity's UUID, not its display name. \
                         Look the ID up first (e.g. with the list_tasks tool)."
                            .to_string(),
                    )
                } else {
                    Some(
                        "IDs are hyphenated UUIDs like 3f2b6c1e-8d4a-4f7b-9c2e-1a5d7e9b0c34"
                            .to_string(),
                    )
                }
            }

            Self::UnknownTool(_) => Some(
                "Valid tools: create_task, update_task_status, write_note, \
                 update_project_metadata, search_similar, list_tasks"
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("status") {
                    Some(
                        "Valid task statuses: task_redline, progress_update, done_completed. \
                         Synonyms: todo→task_redline, wip→progress_update, done→done_completed"
                            .to_string(),
                    )
                } else if msg.contains("priority") {
                    Some("Valid priorities: low, medium, high, urgent (or P0-P3)".to_string())
                } else if msg.contains("phase") {
                    Some("Valid phases: Pre-Design, Design, Permit, Build".to_string())
                } else {
                    None
                }
            }

            Self::RequiredField(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
