//! Folder explorer commands.
//!
//! Everything here goes through [`ProjectExplorer`], so the CLI arranges
//! folders exactly the way the panel does: the saved order is reconciled
//! on load, drags persist immediately, and the database is the remote.

use super::project::require_project;
use super::{arrangement_port, open_storage, preview_port, print_json, resolve_actor};
use crate::arrangement::{arrangement_key, Arrangement, ArrangementStore};
use crate::cli::FolderCommands;
use crate::config::FileArrangementPort;
use crate::error::{Error, Result};
use crate::explorer::{FolderView, ProjectExplorer, RemoteSync};
use crate::model::{Folder, Project};
use crate::storage::SqliteStorage;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct ArrangementOutput<'a> {
    project_id: &'a str,
    order: &'a [String],
    separator_index: i64,
}

impl<'a> ArrangementOutput<'a> {
    fn new(project_id: &'a str, arrangement: &'a Arrangement) -> Self {
        Self {
            project_id,
            order: &arrangement.order,
            separator_index: arrangement.separator_index,
        }
    }
}

#[derive(Serialize)]
struct FolderListOutput<'a> {
    project_id: &'a str,
    separator_index: i64,
    order: &'a [String],
    above: Vec<FolderView<'a>>,
    below: Vec<FolderView<'a>>,
}

/// Execute a folder command.
///
/// # Errors
///
/// Returns an error if the project or folder is unknown or the database
/// operation fails.
pub fn execute(
    command: &FolderCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        FolderCommands::List {
            project,
            query,
            collapsed,
        } => list(&mut storage, project, query.as_deref().unwrap_or(""), *collapsed, &actor, json),
        FolderCommands::Create { project, title } => create(&mut storage, project, title.as_deref(), &actor, json),
        FolderCommands::Rename { folder, title } => rename(&mut storage, folder, title, &actor, json),
        FolderCommands::Delete { folder } => delete(&mut storage, folder, &actor, json),
        FolderCommands::Move { project, folder, index } => {
            move_folder(&mut storage, project, folder, *index, &actor, json)
        }
        FolderCommands::Separator { project, index } => separator(&mut storage, project, *index, &actor, json),
        FolderCommands::Reset { project } => reset(&mut storage, project, &actor, json),
    }
}

fn open_explorer(
    storage: &mut SqliteStorage,
    project_id: &str,
    actor: &str,
) -> Result<(Project, ProjectExplorer<FileArrangementPort>)> {
    let project = require_project(storage, project_id)?;
    let port = arrangement_port()?;
    let explorer = ProjectExplorer::load(&project.id, &storage.remote(actor), port)?;
    Ok((project, explorer))
}

fn require_folder(storage: &SqliteStorage, folder_id: &str) -> Result<Folder> {
    storage
        .get_folder(folder_id)?
        .ok_or_else(|| Error::FolderNotFound { id: folder_id.to_string() })
}

fn list(
    storage: &mut SqliteStorage,
    project_id: &str,
    query: &str,
    collapsed: bool,
    actor: &str,
    json: bool,
) -> Result<()> {
    let (project, explorer) = open_explorer(storage, project_id, actor)?;
    let sections = explorer.sections(query);
    let arrangement = explorer.arrangement();

    if crate::is_csv() {
        println!("index,id,title,side,files");
        let rows = sections
            .above
            .iter()
            .map(|v| (v, "above"))
            .chain(sections.below.iter().map(|v| (v, "below")));
        for (index, (view, side)) in rows.enumerate() {
            println!(
                "{},{},{},{},{}",
                index,
                view.folder.id,
                crate::csv_escape(&view.folder.title),
                side,
                view.files.len()
            );
        }
        return Ok(());
    }

    if json {
        let output = FolderListOutput {
            project_id: &project.id,
            separator_index: arrangement.separator_index,
            order: &arrangement.order,
            above: sections.above,
            below: sections.below,
        };
        return print_json(&output);
    }

    if sections.folder_count() == 0 {
        if query.is_empty() {
            println!("No folders in {}.", project.name);
        } else {
            println!("No files match \"{query}\".");
        }
        return Ok(());
    }

    println!("{} {}", project.name.bold(), format!("({})", project.phase).dimmed());
    println!();
    for view in &sections.above {
        print_folder(view, &project.phase, collapsed);
    }
    if sections.show_separator {
        println!("  {}", "────────────────────────────".dimmed());
    }
    for view in &sections.below {
        print_folder(view, &project.phase, collapsed);
    }

    Ok(())
}

fn print_folder(view: &FolderView<'_>, phase: &str, collapsed: bool) {
    let marker = if view.expanded { "▾" } else { "▸" };
    let count = format!("({})", view.files.len()).dimmed();
    if view.folder.title == phase {
        println!("  {marker} {} {count} {}", view.folder.title.cyan().bold(), "current phase".cyan());
    } else {
        println!("  {marker} {} {count}", view.folder.title);
    }
    if collapsed || !view.expanded {
        return;
    }
    for file in &view.files {
        println!("      {} {}", file.name, file.id.get(..8).unwrap_or(&file.id).dimmed());
    }
}

fn create(
    storage: &mut SqliteStorage,
    project_id: &str,
    title: Option<&str>,
    actor: &str,
    json: bool,
) -> Result<()> {
    if crate::is_dry_run() {
        let project = require_project(storage, project_id)?;
        println!("Would create folder in {}: {}", project.name, title.unwrap_or("New Folder"));
        return Ok(());
    }

    let (project, mut explorer) = open_explorer(storage, project_id, actor)?;
    let folder = explorer.create_folder(title, &mut storage.remote(actor))?;

    if crate::is_silent() {
        println!("{}", folder.id);
        return Ok(());
    }

    if json {
        print_json(&serde_json::json!({
            "folder": folder,
            "arrangement": ArrangementOutput::new(&project.id, explorer.arrangement()),
        }))
    } else {
        println!("Created folder: {}", folder.title);
        println!("  ID: {}", folder.id);
        Ok(())
    }
}

fn rename(storage: &mut SqliteStorage, folder_id: &str, title: &str, actor: &str, json: bool) -> Result<()> {
    let folder = require_folder(storage, folder_id)?;

    if crate::is_dry_run() {
        println!("Would rename folder: {} -> {}", folder.title, title.trim());
        return Ok(());
    }

    let (_, mut explorer) = open_explorer(storage, &folder.project_id, actor)?;
    let sync = explorer.rename_folder(&folder.id, title, &mut storage.remote(actor))?;
    let renamed = explorer.folder(&folder.id).map_or(&folder.title, |f| &f.title);

    if json {
        print_json(&serde_json::json!({
            "id": folder.id,
            "title": renamed,
            "changed": sync.is_some(),
            "sync": sync,
        }))
    } else {
        match sync {
            None => println!("Folder unchanged: {}", folder.title),
            Some(RemoteSync::Failed { error, .. }) => println!("Rename not saved: {error}"),
            Some(_) => println!("Renamed folder: {} -> {renamed}", folder.title),
        }
        Ok(())
    }
}

fn delete(storage: &mut SqliteStorage, folder_id: &str, actor: &str, json: bool) -> Result<()> {
    let folder = require_folder(storage, folder_id)?;

    if crate::is_dry_run() {
        println!("Would delete folder: {} ({})", folder.title, folder.id);
        return Ok(());
    }

    let (_, mut explorer) = open_explorer(storage, &folder.project_id, actor)?;
    let files_deleted = explorer.delete_folder(&folder.id, &mut storage.remote(actor))?;

    if json {
        print_json(&serde_json::json!({
            "deleted": true,
            "id": folder.id,
            "title": folder.title,
            "files_deleted": files_deleted,
        }))
    } else {
        println!("Deleted folder: {} ({files_deleted} files)", folder.title);
        Ok(())
    }
}

fn move_folder(
    storage: &mut SqliteStorage,
    project_id: &str,
    folder_id: &str,
    index: usize,
    actor: &str,
    json: bool,
) -> Result<()> {
    if crate::is_dry_run() {
        let project = require_project(storage, project_id)?;
        let port = arrangement_port()?;
        let key = arrangement_key(&project.id);
        let mut store = ArrangementStore::open(key.clone(), preview_port(&port, &key), &storage.list_folders(&project.id)?);
        let preview = store.move_folder(folder_id, index)?;
        return print_arrangement(&project.id, preview, None, json, true);
    }

    let (project, mut explorer) = open_explorer(storage, project_id, actor)?;
    let sync = explorer.move_folder(folder_id, index, &mut storage.remote(actor))?;
    print_arrangement(&project.id, explorer.arrangement(), Some(&sync), json, false)
}

fn separator(storage: &mut SqliteStorage, project_id: &str, index: i64, actor: &str, json: bool) -> Result<()> {
    if crate::is_dry_run() {
        let project = require_project(storage, project_id)?;
        let port = arrangement_port()?;
        let key = arrangement_key(&project.id);
        let mut store = ArrangementStore::open(key.clone(), preview_port(&port, &key), &storage.list_folders(&project.id)?);
        let preview = store.move_separator(index);
        return print_arrangement(&project.id, preview, None, json, true);
    }

    let (project, mut explorer) = open_explorer(storage, project_id, actor)?;
    explorer.begin_separator_drag();
    explorer.drag_separator(index);
    let arrangement = explorer.release_separator();
    print_arrangement(&project.id, arrangement, None, json, false)
}

fn reset(storage: &mut SqliteStorage, project_id: &str, actor: &str, json: bool) -> Result<()> {
    if crate::is_dry_run() {
        let project = require_project(storage, project_id)?;
        println!("Would reset folder arrangement for {}", project.name);
        return Ok(());
    }

    let (project, mut explorer) = open_explorer(storage, project_id, actor)?;
    let arrangement = explorer.reset_arrangement();
    print_arrangement(&project.id, arrangement, None, json, false)
}

fn print_arrangement(
    project_id: &str,
    arrangement: &Arrangement,
    sync: Option<&RemoteSync>,
    json: bool,
    dry_run: bool,
) -> Result<()> {
    if json {
        let mut output = serde_json::to_value(ArrangementOutput::new(project_id, arrangement))?;
        if let Some(sync) = sync {
            output["remote"] = serde_json::to_value(sync)?;
        }
        if dry_run {
            output["dry_run"] = serde_json::Value::Bool(true);
        }
        return print_json(&output);
    }

    if dry_run {
        println!("Would arrange folders:");
    } else {
        println!("Folder arrangement:");
    }
    for (i, id) in arrangement.order.iter().enumerate() {
        if usize::try_from(arrangement.separator_index).ok() == Some(i) {
            println!("  {}", "────────".dimmed());
        }
        println!("  {i}. {id}");
    }
    if arrangement.separator() == Some(arrangement.len()) && !arrangement.is_empty() {
        println!("  {}", "────────".dimmed());
    }
    if let Some(RemoteSync::Failed { error, .. }) = sync {
        println!("{} {error}", "Warning: order kept locally, remote update failed:".yellow());
    }
    Ok(())
}
