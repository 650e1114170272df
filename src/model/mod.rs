//! Data models for Planroom.
//!
//! This module contains the domain models shared by storage, the
//! explorer panel and the tool dispatcher:
//! - Project
//! - Folder / ProjectFile
//! - Task

pub mod folder;
pub mod project;
pub mod task;

pub use folder::{content_checksum, Folder, ProjectFile};
pub use project::{Project, ProjectUpdate};
pub use task::{NewTask, Task, TaskPriority, TaskStatus};
