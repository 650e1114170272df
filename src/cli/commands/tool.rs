//! Run AI assistant tool calls from the command line.
//!
//! `planroom tool call '{"name": "create_task", "arguments": {...}}'`
//! runs one call through the same dispatcher the chat integration uses.
//! A failed call exits non-zero with the structured error on stderr.

use super::{open_storage, print_json};
use crate::cli::ToolCommands;
use crate::error::Result;
use crate::tools::{describe, ToolCall, ToolDispatcher, AI_ACTOR, TOOL_NAMES};
use colored::Colorize;
use std::io::Read;
use std::path::PathBuf;

/// Execute a tool command.
///
/// # Errors
///
/// Returns an error if the payload cannot be read or parsed, or the call
/// itself fails.
pub fn execute(
    command: &ToolCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        ToolCommands::List => list(json),
        ToolCommands::Call { payload } => {
            let raw = if payload == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            } else {
                payload.clone()
            };
            call(&raw, db_path, actor.unwrap_or(AI_ACTOR), json)
        }
    }
}

fn call(raw: &str, db_path: Option<&PathBuf>, actor: &str, json: bool) -> Result<()> {
    let call = ToolCall::parse(raw)?;

    if crate::is_dry_run() && call.is_mutation() {
        if json {
            print_json(&serde_json::json!({
                "dry_run": true,
                "tool": call.name(),
            }))?;
        } else {
            println!("Would call {}", call.name());
        }
        return Ok(());
    }

    let mut storage = open_storage(db_path)?;
    let outcome = ToolDispatcher::new(&mut storage, actor).call(call)?;

    if json {
        print_json(&outcome)
    } else {
        println!("{} {}", outcome.tool.cyan(), outcome.message);
        if !outcome.data.is_null() {
            println!("{}", serde_json::to_string_pretty(&outcome.data)?);
        }
        Ok(())
    }
}

fn list(json: bool) -> Result<()> {
    if json {
        let tools: Vec<_> = TOOL_NAMES
            .iter()
            .map(|name| serde_json::json!({ "name": name, "description": describe(name) }))
            .collect();
        return print_json(&tools);
    }

    println!("Tools:\n");
    for name in TOOL_NAMES {
        println!("  {}", name.bold());
        println!("    {}", describe(name));
    }
    Ok(())
}
