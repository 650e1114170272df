//! Project management commands.
//!
//! - `planroom project create <name>` - Create a project and its standard folders
//! - `planroom project list` - List all projects
//! - `planroom project show <id>` - Show project details
//! - `planroom project update <id>` - Update project metadata
//! - `planroom project delete <id>` - Delete a project

use super::{arrangement_port, format_timestamp, open_storage, print_json, resolve_actor};
use crate::arrangement::arrangement_key;
use crate::cli::{ProjectCommands, ProjectCreateArgs, ProjectUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{Project, ProjectUpdate};
use crate::storage::SqliteStorage;
use crate::validate::{invalid_value, normalize_phase, normalize_project_status};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Serialize)]
struct ProjectOutput {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    phase: String,
    address: Option<String>,
    task_prefix: String,
    next_task_number: i32,
    created_at: String,
    updated_at: String,
}

impl From<Project> for ProjectOutput {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            status: p.status,
            phase: p.phase,
            address: p.address,
            task_prefix: p.task_prefix,
            next_task_number: p.next_task_number,
            created_at: format_timestamp(p.created_at),
            updated_at: format_timestamp(p.updated_at),
        }
    }
}

#[derive(Serialize)]
struct ProjectListOutput {
    projects: Vec<ProjectOutput>,
    count: usize,
}

#[derive(Serialize)]
struct ProjectWithCounts {
    #[serde(flatten)]
    project: ProjectOutput,
    folder_count: usize,
    file_count: usize,
    task_count: usize,
}

/// Execute a project command.
///
/// # Errors
///
/// Returns an error if the database is missing or the operation fails.
pub fn execute(
    command: &ProjectCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json_output: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        ProjectCommands::Create(args) => execute_create(&mut storage, args, json_output, &actor),
        ProjectCommands::List { limit } => execute_list(&storage, *limit, json_output),
        ProjectCommands::Show { id } => execute_show(&storage, id, json_output),
        ProjectCommands::Update(args) => execute_update(&mut storage, args, json_output, &actor),
        ProjectCommands::Delete { id, force } => execute_delete(&mut storage, id, *force, json_output, &actor),
    }
}

/// Load a project or fail with `ProjectNotFound`.
pub(crate) fn require_project(storage: &SqliteStorage, id: &str) -> Result<Project> {
    storage
        .get_project(id)?
        .ok_or_else(|| Error::ProjectNotFound { id: id.to_string() })
}

fn execute_create(
    storage: &mut SqliteStorage,
    args: &ProjectCreateArgs,
    json_output: bool,
    actor: &str,
) -> Result<()> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(Error::RequiredField("name".to_string()));
    }

    let mut project = Project::new(name.to_string());
    project.description.clone_from(&args.description);
    project.address.clone_from(&args.address);
    if let Some(phase) = &args.phase {
        project.phase = normalize_phase(phase).map_err(|e| invalid_value("phase", e))?;
    }
    if let Some(status) = &args.status {
        project.status = normalize_project_status(status).map_err(|e| invalid_value("project status", e))?;
    }
    if let Some(prefix) = &args.prefix {
        let prefix: String = prefix.chars().filter(char::is_ascii_alphanumeric).collect();
        if prefix.is_empty() {
            return Err(Error::InvalidArgument("prefix must contain letters or digits".to_string()));
        }
        project.task_prefix = prefix.to_uppercase();
    }

    if crate::is_dry_run() {
        if json_output {
            let output = serde_json::json!({
                "dry_run": true,
                "action": "create_project",
                "name": project.name,
                "phase": project.phase,
                "status": project.status,
                "task_prefix": project.task_prefix,
            });
            println!("{output}");
        } else {
            println!("Would create project: {} [{}]", project.name, project.task_prefix);
        }
        return Ok(());
    }

    let folders = storage.create_project(&project, actor)?;

    if crate::is_silent() {
        println!("{}", project.id);
        return Ok(());
    }

    if json_output {
        let output = serde_json::json!({
            "project": ProjectOutput::from(project),
            "folders": folders,
        });
        print_json(&output)?;
    } else {
        println!("Created project: {}", project.name);
        println!("  ID: {}", project.id);
        println!("  Task prefix: {}", project.task_prefix);
        println!("  Phase: {}", project.phase);
        println!("  Folders: {}", folders.iter().map(|f| f.title.as_str()).collect::<Vec<_>>().join(", "));
    }

    Ok(())
}

fn execute_list(storage: &SqliteStorage, limit: usize, json_output: bool) -> Result<()> {
    let projects = storage.list_projects(limit)?;

    if crate::is_csv() {
        println!("id,name,status,phase,prefix");
        for p in &projects {
            println!(
                "{},{},{},{},{}",
                p.id,
                crate::csv_escape(&p.name),
                p.status,
                p.phase,
                p.task_prefix
            );
        }
    } else if json_output {
        let output = ProjectListOutput {
            count: projects.len(),
            projects: projects.into_iter().map(ProjectOutput::from).collect(),
        };
        print_json(&output)?;
    } else if projects.is_empty() {
        println!("No projects found.");
        println!("\nCreate one with: planroom project create \"<name>\"");
    } else {
        println!("Projects ({}):\n", projects.len());
        for project in &projects {
            println!("  {} [{}] {} / {}", project.name, project.task_prefix, project.phase, project.status);
            println!("    ID:   {}", project.id);
            if let Some(desc) = &project.description {
                println!("    Desc: {desc}");
            }
            println!();
        }
    }

    Ok(())
}

fn execute_show(storage: &SqliteStorage, id: &str, json_output: bool) -> Result<()> {
    let project = require_project(storage, id)?;
    let folder_count = storage.list_folders(&project.id)?.len();
    let file_count = storage.list_files(&project.id)?.len();
    let task_count = storage.list_tasks(&project.id, None)?.len();

    if json_output {
        let output = ProjectWithCounts {
            project: ProjectOutput::from(project),
            folder_count,
            file_count,
            task_count,
        };
        print_json(&output)?;
    } else {
        println!("Project: {}", project.name);
        println!("  ID:          {}", project.id);
        println!("  Status:      {}", project.status);
        println!("  Phase:       {}", project.phase);
        println!("  Task prefix: {}", project.task_prefix);
        println!("  Address:     {}", project.address.as_deref().unwrap_or("-"));
        println!("  Description: {}", project.description.as_deref().unwrap_or("-"));
        println!();
        println!("Contents:");
        println!("  Folders: {folder_count}");
        println!("  Files:   {file_count}");
        println!("  Tasks:   {task_count}");
        println!();
        println!("Created: {}", format_timestamp(project.created_at));
        println!("Updated: {}", format_timestamp(project.updated_at));
    }

    Ok(())
}

fn execute_update(
    storage: &mut SqliteStorage,
    args: &ProjectUpdateArgs,
    json_output: bool,
    actor: &str,
) -> Result<()> {
    let project = require_project(storage, &args.id)?;

    let update = ProjectUpdate {
        name: args.name.clone(),
        description: args.description.clone(),
        status: args
            .status
            .as_deref()
            .map(|s| normalize_project_status(s).map_err(|e| invalid_value("project status", e)))
            .transpose()?,
        phase: args
            .phase
            .as_deref()
            .map(|p| normalize_phase(p).map_err(|e| invalid_value("phase", e)))
            .transpose()?,
        address: args.address.clone(),
    };
    if update.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update (pass --name, --description, --status, --phase or --address)".to_string(),
        ));
    }

    if crate::is_dry_run() {
        let mut preview = project.clone();
        update.apply_to(&mut preview);
        if json_output {
            print_json(&serde_json::json!({
                "dry_run": true,
                "action": "update_project",
                "project": ProjectOutput::from(preview),
            }))?;
        } else {
            println!("Would update project: {} ({}, {})", preview.name, preview.status, preview.phase);
        }
        return Ok(());
    }

    let updated = storage.update_project(&project.id, &update, actor)?;

    if crate::is_silent() {
        println!("{}", updated.id);
        return Ok(());
    }

    if json_output {
        print_json(&ProjectOutput::from(updated))?;
    } else {
        println!("Updated project: {}", updated.name);
        if update.status.is_some() {
            println!("  Status: {}", updated.status);
        }
        if update.phase.is_some() {
            println!("  Phase: {}", updated.phase);
        }
        if update.description.is_some() {
            println!("  Description: {}", updated.description.as_deref().unwrap_or("-"));
        }
        if update.address.is_some() {
            println!("  Address: {}", updated.address.as_deref().unwrap_or("-"));
        }
    }

    Ok(())
}

fn execute_delete(
    storage: &mut SqliteStorage,
    id: &str,
    force: bool,
    json_output: bool,
    actor: &str,
) -> Result<()> {
    let project = require_project(storage, id)?;
    let file_count = storage.list_files(&project.id)?.len();
    let task_count = storage.list_tasks(&project.id, None)?.len();

    if !force && !json_output {
        println!("Warning: This will delete {} and everything in it:", project.name);
        println!("  {file_count} files");
        println!("  {task_count} tasks");
        println!();
        println!("Use --force to confirm deletion.");
        return Ok(());
    }

    if crate::is_dry_run() {
        println!("Would delete project: {} ({})", project.name, project.id);
        return Ok(());
    }

    storage.delete_project(&project.id, actor)?;

    let key = arrangement_key(&project.id);
    if let Err(e) = arrangement_port().and_then(|port| port.remove(&key)) {
        warn!(key = %key, error = %e, "Could not remove saved arrangement");
    }

    if json_output {
        let output = serde_json::json!({
            "deleted": true,
            "id": project.id,
            "name": project.name,
            "files_deleted": file_count,
            "tasks_deleted": task_count,
        });
        print_json(&output)?;
    } else {
        println!("Deleted project: {} ({})", project.name, project.id);
    }

    Ok(())
}
