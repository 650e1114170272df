//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Planroom CLI - project folders, manual arrangement and AI tool calls
#[derive(Parser, Debug)]
#[command(name = "planroom", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.planroom/data/planroom.db)
    #[arg(long, global = true, env = "PLANROOM_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "PLANROOM_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON (for agent integration)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Preview changes without writing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the Planroom database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Project management
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Folder explorer: list, arrange, rename, delete
    Folder {
        #[command(subcommand)]
        command: FolderCommands,
    },

    /// Files inside project folders
    File {
        #[command(subcommand)]
        command: FileCommands,
    },

    /// Task board
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Run AI assistant tool calls
    Tool {
        #[command(subcommand)]
        command: ToolCommands,
    },

    /// Show the audit log
    History(HistoryArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Project Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project (seeds the standard folders)
    Create(ProjectCreateArgs),

    /// List all projects
    List {
        /// Maximum projects to return
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show project details
    Show {
        /// Project ID
        id: String,
    },

    /// Update project metadata
    Update(ProjectUpdateArgs),

    /// Delete a project with its folders, files and tasks
    Delete {
        /// Project ID
        id: String,

        /// Skip confirmation and delete
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct ProjectCreateArgs {
    /// Project name
    pub name: String,

    /// Project description
    #[arg(short, long)]
    pub description: Option<String>,

    /// Phase (Pre-Design, Design, Permit, Build)
    #[arg(long)]
    pub phase: Option<String>,

    /// Status (pending, active, completed, archived)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Task ID prefix (e.g., "OAKS" for OAKS-1)
    #[arg(short, long)]
    pub prefix: Option<String>,

    /// Site address
    #[arg(long)]
    pub address: Option<String>,
}

#[derive(Args, Debug)]
pub struct ProjectUpdateArgs {
    /// Project ID
    pub id: String,

    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New status
    #[arg(short, long)]
    pub status: Option<String>,

    /// New phase
    #[arg(long)]
    pub phase: Option<String>,

    /// New site address
    #[arg(long)]
    pub address: Option<String>,
}

// ============================================================================
// Folder Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FolderCommands {
    /// Show folders in arranged order, split at the separator
    List {
        /// Project ID
        project: String,

        /// Only show files whose name contains this text
        #[arg(short = 's', long)]
        query: Option<String>,

        /// Hide files, show folders only
        #[arg(long)]
        collapsed: bool,
    },

    /// Create a folder ("New Folder", "New Folder (1)", ... if no title)
    Create {
        /// Project ID
        project: String,

        /// Folder title
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Rename a folder
    Rename {
        /// Folder ID
        folder: String,

        /// New title
        title: String,
    },

    /// Delete a folder and its files
    Delete {
        /// Folder ID
        folder: String,
    },

    /// Drag a folder to a display position
    Move {
        /// Project ID
        project: String,

        /// Folder ID
        folder: String,

        /// Target display index (0-based)
        index: usize,
    },

    /// Move the separator line
    Separator {
        /// Project ID
        project: String,

        /// Number of folders above the line
        index: i64,
    },

    /// Throw away the manual arrangement and restore the default order
    Reset {
        /// Project ID
        project: String,
    },
}

// ============================================================================
// File Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum FileCommands {
    /// Upload a local file into a folder
    Add {
        /// Project ID
        project: String,

        /// Folder ID
        folder: String,

        /// Local file path
        path: PathBuf,

        /// Display name (defaults to the file name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List a project's files
    List {
        /// Project ID
        project: String,

        /// Only files in this folder
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Rename a file
    Rename {
        /// File ID
        file: String,

        /// New name
        name: String,
    },

    /// Drag a file onto a row of another (or the same) folder
    Move {
        /// Project ID
        project: String,

        /// File ID
        file: String,

        /// Target folder ID
        folder: String,

        /// Row index in the target folder
        #[arg(short, long, default_value = "0")]
        index: usize,

        /// Drop below the row instead of above it
        #[arg(long)]
        below: bool,
    },

    /// Delete a file
    Delete {
        /// File ID
        file: String,
    },
}

// ============================================================================
// Task Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Create {
        /// Project ID
        project: String,

        /// Task title
        title: String,

        /// Priority (low, medium, high, urgent, or P0-P3)
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List a project's tasks
    List {
        /// Project ID
        project: String,

        /// Filter by status (task_redline, progress_update, done_completed or synonyms)
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Change a task's status
    Status {
        /// Task ID or short ID (e.g. OAKS-3)
        task: String,

        /// New status
        status: String,
    },
}

// ============================================================================
// Tool Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ToolCommands {
    /// Run one tool call: '{"name": "...", "arguments": {...}}' ("-" reads stdin)
    Call {
        /// Tool call JSON
        payload: String,
    },

    /// List available tools
    List,
}

// ============================================================================
// History
// ============================================================================

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Entity type (project, folder, file, task)
    #[arg(short = 't', long)]
    pub entity_type: Option<String>,

    /// Entity ID (requires --entity-type)
    #[arg(short = 'i', long)]
    pub entity_id: Option<String>,

    /// Maximum events to return
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
}
