//! Audit log viewer.

use super::{format_timestamp, open_storage, print_json};
use crate::cli::HistoryArgs;
use crate::error::{Error, Result};
use crate::storage::events::Event;
use colored::Colorize;
use std::path::PathBuf;

const ENTITY_TYPES: [&str; 4] = ["project", "folder", "file", "task"];

/// Execute the history command.
///
/// # Errors
///
/// Returns `InvalidArgument` for an unknown entity type or an entity id
/// without a type, or an error if the query fails.
pub fn execute(args: &HistoryArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let entity_type = args.entity_type.as_deref().map(str::to_lowercase);
    if let Some(t) = &entity_type {
        if !ENTITY_TYPES.contains(&t.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "unknown entity type '{t}' (expected one of: {})",
                ENTITY_TYPES.join(", ")
            )));
        }
    }

    let storage = open_storage(db_path)?;
    let events = match (entity_type.as_deref(), args.entity_id.as_deref()) {
        (Some(t), Some(id)) => storage.get_events(t, id, Some(args.limit))?,
        (None, Some(_)) => {
            return Err(Error::InvalidArgument("--entity-id requires --entity-type".to_string()));
        }
        (t, None) => storage.list_recent_events(t, args.limit)?,
    };

    if crate::is_csv() {
        println!("id,entity_type,entity_id,event_type,actor,comment,created_at");
        for e in &events {
            println!(
                "{},{},{},{},{},{},{}",
                e.id,
                e.entity_type,
                e.entity_id,
                e.event_type.as_str(),
                crate::csv_escape(&e.actor),
                crate::csv_escape(e.comment.as_deref().unwrap_or("")),
                format_timestamp(e.created_at)
            );
        }
    } else if json {
        let count = events.len();
        print_json(&serde_json::json!({
            "events": events,
            "count": count,
        }))?;
    } else if events.is_empty() {
        println!("No events.");
    } else {
        for e in &events {
            print_event(e);
        }
    }

    Ok(())
}

fn print_event(e: &Event) {
    let comment = e.comment.as_deref().map(|c| format!(" ({c})")).unwrap_or_default();
    println!(
        "{} {} {} {}{}",
        format_timestamp(e.created_at).dimmed(),
        e.event_type.as_str().cyan(),
        e.entity_id,
        format!("by {}", e.actor).dimmed(),
        comment.dimmed()
    );
}
