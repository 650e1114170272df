//! SQLite storage layer for Planroom.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation
//! - [`remote`] - The `ProjectRemote` port the explorer talks to

pub mod events;
pub mod migrations;
pub mod remote;
pub mod schema;
pub mod sqlite;

pub use remote::{ProjectRemote, StorageRemote};
pub use sqlite::{MutationContext, SqliteStorage};
