//! Task board commands.

use super::project::require_project;
use super::{format_timestamp, open_storage, print_json, resolve_actor};
use crate::cli::TaskCommands;
use crate::error::{Error, Result};
use crate::model::{NewTask, Task, TaskPriority, TaskStatus};
use crate::storage::SqliteStorage;
use crate::tools::dispatch::parse_due_date;
use crate::validate::invalid_value;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct TaskListOutput {
    tasks: Vec<Task>,
    count: usize,
}

/// Execute a task command.
///
/// # Errors
///
/// Returns an error if the project or task is unknown, a value does not
/// parse, or the database operation fails.
pub fn execute(
    command: &TaskCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        TaskCommands::Create {
            project,
            title,
            priority,
            description,
            due,
        } => {
            let priority = TaskPriority::parse(priority).map_err(|e| invalid_value("priority", e))?;
            let new = NewTask {
                title: title.trim().to_string(),
                description: description.clone(),
                priority,
                due_date: due.as_deref().map(parse_due_date).transpose()?,
            };
            create(&mut storage, project, &new, &actor, json)
        }
        TaskCommands::List { project, status } => {
            let status = status
                .as_deref()
                .map(|s| TaskStatus::parse(s).map_err(|e| invalid_value("task status", e)))
                .transpose()?;
            list(&storage, project, status, json)
        }
        TaskCommands::Status { task, status } => {
            let status = TaskStatus::parse(status).map_err(|e| invalid_value("task status", e))?;
            set_status(&mut storage, task, status, &actor, json)
        }
    }
}

fn create(storage: &mut SqliteStorage, project_id: &str, new: &NewTask, actor: &str, json: bool) -> Result<()> {
    if new.title.is_empty() {
        return Err(Error::RequiredField("title".to_string()));
    }
    let project = require_project(storage, project_id)?;

    if crate::is_dry_run() {
        println!(
            "Would create task {}: {} [{}]",
            project.next_task_short_id(),
            new.title,
            new.priority.as_str()
        );
        return Ok(());
    }

    let task = storage.create_task(&project.id, new, actor)?;

    if crate::is_silent() {
        println!("{}", task.short_id);
        return Ok(());
    }

    if json {
        print_json(&task)
    } else {
        println!("Created task {}: {}", task.short_id.cyan(), task.title);
        println!("  ID: {}", task.id);
        println!("  Priority: {}", task.priority.as_str());
        if let Some(due) = &task.due_date {
            println!("  Due: {due}");
        }
        Ok(())
    }
}

fn list(storage: &SqliteStorage, project_id: &str, status: Option<TaskStatus>, json: bool) -> Result<()> {
    let project = require_project(storage, project_id)?;
    let tasks = storage.list_tasks(&project.id, status)?;

    if crate::is_csv() {
        println!("short_id,title,status,priority,due_date");
        for t in &tasks {
            println!(
                "{},{},{},{},{}",
                t.short_id,
                crate::csv_escape(&t.title),
                t.status.as_str(),
                t.priority.as_str(),
                t.due_date.as_deref().unwrap_or("")
            );
        }
    } else if json {
        let output = TaskListOutput {
            count: tasks.len(),
            tasks,
        };
        print_json(&output)?;
    } else if tasks.is_empty() {
        println!("No tasks in {}.", project.name);
    } else {
        println!("Tasks in {} ({}):\n", project.name, tasks.len());
        for t in &tasks {
            let status = match t.status {
                TaskStatus::TaskRedline => t.status.as_str().red(),
                TaskStatus::ProgressUpdate => t.status.as_str().yellow(),
                TaskStatus::DoneCompleted => t.status.as_str().green(),
            };
            println!(
                "  {} {} {} {}",
                t.short_id.cyan(),
                t.title,
                format!("[{}]", t.priority.as_str()).dimmed(),
                status
            );
            if let Some(due) = &t.due_date {
                println!("    due {due}, updated {}", format_timestamp(t.updated_at));
            }
        }
    }

    Ok(())
}

fn set_status(storage: &mut SqliteStorage, task_id: &str, status: TaskStatus, actor: &str, json: bool) -> Result<()> {
    let task = storage
        .get_task(task_id)?
        .ok_or_else(|| Error::TaskNotFound { id: task_id.to_string() })?;

    if crate::is_dry_run() {
        println!("Would move {} from {} to {}", task.short_id, task.status.as_str(), status.as_str());
        return Ok(());
    }

    let updated = storage.update_task_status(&task.id, status, actor)?;

    if json {
        print_json(&serde_json::json!({
            "task": updated,
            "previous_status": task.status,
        }))
    } else {
        println!(
            "{}: {} -> {}",
            updated.short_id.cyan(),
            task.status.as_str(),
            updated.status.as_str()
        );
        Ok(())
    }
}
