//! File commands: upload, list, rename, move between folders, delete.

use super::project::require_project;
use super::{arrangement_port, format_timestamp, open_storage, print_json, resolve_actor};
use crate::cli::FileCommands;
use crate::error::{Error, Result};
use crate::explorer::{DropPosition, ProjectExplorer, RemoteSync};
use crate::model::{content_checksum, ProjectFile};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct FileListOutput {
    files: Vec<ProjectFile>,
    count: usize,
}

/// Execute a file command.
///
/// # Errors
///
/// Returns an error if the project, folder or file is unknown, the local
/// file cannot be read, or the database operation fails.
pub fn execute(
    command: &FileCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path)?;
    let actor = resolve_actor(actor);

    match command {
        FileCommands::Add {
            project,
            folder,
            path,
            name,
        } => add(&mut storage, project, folder, path, name.as_deref(), &actor, json),
        FileCommands::List { project, folder } => list(&storage, project, folder.as_deref(), json),
        FileCommands::Rename { file, name } => rename(&mut storage, file, name, &actor, json),
        FileCommands::Move {
            project,
            file,
            folder,
            index,
            below,
        } => {
            let position = if *below { DropPosition::Below } else { DropPosition::Above };
            move_file(&mut storage, project, file, folder, *index, position, &actor, json)
        }
        FileCommands::Delete { file } => delete(&mut storage, file, &actor, json),
    }
}

fn require_file(storage: &SqliteStorage, file_id: &str) -> Result<ProjectFile> {
    storage
        .get_file(file_id)?
        .ok_or_else(|| Error::FileNotFound { id: file_id.to_string() })
}

fn add(
    storage: &mut SqliteStorage,
    project_id: &str,
    folder_id: &str,
    path: &Path,
    name: Option<&str>,
    actor: &str,
    json: bool,
) -> Result<()> {
    let project = require_project(storage, project_id)?;
    let folder = storage
        .get_folder(folder_id)?
        .filter(|f| f.project_id == project.id)
        .ok_or_else(|| Error::FolderNotFound { id: folder_id.to_string() })?;

    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| Error::InvalidArgument(format!("not a file path: {}", path.display())))?,
    };

    let bytes = fs::read(path)?;
    let mut file = ProjectFile::new(&project.id, &folder.id, &name);
    file.size = i64::try_from(bytes.len()).ok();
    file.checksum = Some(content_checksum(&bytes));
    file.mimetype = ProjectFile::guess_mimetype(&name).map(str::to_string);
    file.storage_path = Some(
        fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string(),
    );

    if crate::is_dry_run() {
        println!("Would add {} to {} ({} bytes)", file.name, folder.title, bytes.len());
        return Ok(());
    }

    storage.add_file(&file, actor)?;

    if crate::is_silent() {
        println!("{}", file.id);
        return Ok(());
    }

    if json {
        print_json(&file)
    } else {
        println!("Added {} to {}", file.name, folder.title);
        println!("  ID: {}", file.id);
        if let Some(checksum) = &file.checksum {
            println!("  SHA-256: {checksum}");
        }
        Ok(())
    }
}

fn list(storage: &SqliteStorage, project_id: &str, folder_id: Option<&str>, json: bool) -> Result<()> {
    let project = require_project(storage, project_id)?;
    let folders = storage.list_folders(&project.id)?;
    if let Some(id) = folder_id {
        if !folders.iter().any(|f| f.id == id) {
            return Err(Error::FolderNotFound { id: id.to_string() });
        }
    }

    let files: Vec<ProjectFile> = storage
        .list_files(&project.id)?
        .into_iter()
        .filter(|f| folder_id.is_none_or(|id| f.folder_id == id))
        .collect();

    if crate::is_csv() {
        println!("id,name,folder,size,updated_at");
        for f in &files {
            println!(
                "{},{},{},{},{}",
                f.id,
                crate::csv_escape(&f.name),
                f.folder_id,
                f.size.map(|s| s.to_string()).unwrap_or_default(),
                format_timestamp(f.updated_at)
            );
        }
    } else if json {
        let output = FileListOutput {
            count: files.len(),
            files,
        };
        print_json(&output)?;
    } else if files.is_empty() {
        println!("No files.");
    } else {
        let title_of = |id: &str| {
            folders
                .iter()
                .find(|f| f.id == id)
                .map_or("?", |f| f.title.as_str())
        };
        println!("Files ({}):\n", files.len());
        for f in &files {
            println!("  {} [{}]", f.name, title_of(&f.folder_id));
            println!("    ID: {}", f.id);
        }
    }

    Ok(())
}

fn rename(storage: &mut SqliteStorage, file_id: &str, name: &str, actor: &str, json: bool) -> Result<()> {
    let file = require_file(storage, file_id)?;

    if crate::is_dry_run() {
        println!("Would rename file: {} -> {}", file.name, name.trim());
        return Ok(());
    }

    let mut explorer = ProjectExplorer::load(&file.project_id, &storage.remote(actor), arrangement_port()?)?;
    let sync = explorer.rename_file(&file.id, name, &mut storage.remote(actor))?;
    report_sync(&file, "rename", &sync, json, |out| {
        println!("Renamed file: {} -> {}", out.name, name.trim());
    })
}

#[allow(clippy::too_many_arguments)]
fn move_file(
    storage: &mut SqliteStorage,
    project_id: &str,
    file_id: &str,
    to_folder: &str,
    index: usize,
    position: DropPosition,
    actor: &str,
    json: bool,
) -> Result<()> {
    let project = require_project(storage, project_id)?;
    let file = require_file(storage, file_id)?;
    if file.project_id != project.id {
        return Err(Error::FileNotFound { id: file_id.to_string() });
    }

    if crate::is_dry_run() {
        println!("Would move {} to folder {to_folder} at row {index}", file.name);
        return Ok(());
    }

    let mut explorer = ProjectExplorer::load(&project.id, &storage.remote(actor), arrangement_port()?)?;
    let sync = explorer.move_file(&file.id, to_folder, index, position, &mut storage.remote(actor))?;
    let placement = explorer.files().locate(&file.id);

    if json {
        return print_json(&serde_json::json!({
            "id": file.id,
            "name": file.name,
            "placement": placement,
            "remote": sync,
        }));
    }

    match (&sync, placement) {
        (RemoteSync::Failed { error, .. }, _) => println!("Move not saved: {error}"),
        (_, Some(p)) => {
            let title = explorer.folder(&p.folder_id).map_or(p.folder_id.as_str(), |f| f.title.as_str());
            println!("Moved {} to {title} (row {})", file.name, p.index);
        }
        (_, None) => println!("Moved {}", file.name),
    }
    Ok(())
}

fn delete(storage: &mut SqliteStorage, file_id: &str, actor: &str, json: bool) -> Result<()> {
    let file = require_file(storage, file_id)?;

    if crate::is_dry_run() {
        println!("Would delete file: {} ({})", file.name, file.id);
        return Ok(());
    }

    let mut explorer = ProjectExplorer::load(&file.project_id, &storage.remote(actor), arrangement_port()?)?;
    let removed = explorer.delete_file(&file.id, &mut storage.remote(actor))?;

    if json {
        print_json(&serde_json::json!({
            "deleted": true,
            "id": removed.id,
            "name": removed.name,
        }))
    } else {
        println!("Deleted file: {}", removed.name);
        Ok(())
    }
}

fn report_sync(
    file: &ProjectFile,
    action: &str,
    sync: &RemoteSync,
    json: bool,
    on_success: impl FnOnce(&ProjectFile),
) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "id": file.id,
            "action": action,
            "remote": sync,
        }));
    }
    if let RemoteSync::Failed { error, .. } = sync {
        println!("Could not {action} {}: {error}", file.name);
    } else {
        on_success(file);
    }
    Ok(())
}
