//! Directory management CLI commands.

use clap::{Args, Subcommand};
use uuid::Uuid;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;

use super::rows::{DirectoryRow, FileRow};
use crate::output::{self, OutputFormat};

/// Arguments for directory commands
#[derive(Debug, Args)]
pub struct DirArgs {
    /// Directory subcommand
    #[command(subcommand)]
    pub command: DirCommand,
}

/// Directory subcommands
#[derive(Debug, Subcommand)]
pub enum DirCommand {
    /// Show the root directory
    Root,
    /// Show one directory
    Get {
        /// Directory ID
        id: Uuid,
    },
    /// Create a directory
    Create {
        /// Directory name
        #[arg(short, long)]
        name: String,
        /// Parent directory ID
        #[arg(short, long)]
        parent_id: Uuid,
    },
    /// Rename a directory
    Rename {
        /// Directory ID
        id: Uuid,
        /// New name
        #[arg(short, long)]
        name: String,
    },
    /// Move a directory, and everything below it, under another directory
    Move {
        /// Directory ID
        id: Uuid,
        /// New parent directory ID
        #[arg(short, long)]
        target_id: Uuid,
    },
    /// Delete a directory and everything below it
    Delete {
        /// Directory ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Immediate child directories and files
    Children {
        /// Directory ID
        id: Uuid,
    },
    /// Path from the root down to a directory
    Breadcrumbs {
        /// Directory ID
        id: Uuid,
    },
    /// Nested outline of a directory's subtree
    Tree {
        /// Directory ID (defaults to the root)
        id: Option<Uuid>,
    },
    /// Directories whose name contains a substring
    Find {
        /// Case-insensitive substring
        query: String,
    },
    /// Every directory
    List,
}

/// Execute directory commands
pub async fn execute(
    args: &DirArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::open_services(config).await?;
    let directories = &services.directories;

    match &args.command {
        DirCommand::Root => {
            let root = directories.get_root().await?;
            output::print_item(&DirectoryRow::from(&root), format);
        }
        DirCommand::Get { id } => {
            let directory = directories
                .get_directory(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Directory {id} not found")))?;
            output::print_item(&DirectoryRow::from(&directory), format);
        }
        DirCommand::Create { name, parent_id } => {
            let directory = directories.create_directory(name, *parent_id).await?;
            output::print_success(&format!("Directory '{}' created (id: {})", name, directory.id));
        }
        DirCommand::Rename { id, name } => {
            directories.rename_directory(*id, name).await?;
            output::print_success(&format!("Directory {id} renamed to '{name}'"));
        }
        DirCommand::Move { id, target_id } => {
            let moved = directories.move_directory(*id, *target_id).await?;
            output::print_success(&format!(
                "Directory '{}' moved under {target_id} (depth {})",
                moved.name,
                moved.depth()
            ));
        }
        DirCommand::Delete { id, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Delete directory {id} and everything below it?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            directories.delete_directory(*id).await?;
            output::print_success(&format!("Directory {id} deleted"));
        }
        DirCommand::Children { id } => {
            let children = directories.get_directory_children(*id).await?;
            let dirs: Vec<DirectoryRow> = children.directories.iter().map(Into::into).collect();
            let files: Vec<FileRow> = children.files.iter().map(Into::into).collect();
            output::print_list(&dirs, format);
            output::print_list(&files, format);
        }
        DirCommand::Breadcrumbs { id } => {
            let crumbs = directories.get_breadcrumbs(*id).await?;
            match format {
                OutputFormat::Table => {
                    let path: Vec<&str> = crumbs.iter().map(|d| d.name.as_str()).collect();
                    println!("{}", path.join(" / "));
                }
                OutputFormat::Json => {
                    let rows: Vec<DirectoryRow> = crumbs.iter().map(Into::into).collect();
                    output::print_list(&rows, format);
                }
            }
        }
        DirCommand::Tree { id } => {
            let id = match id {
                Some(id) => *id,
                None => directories.get_root().await?.id,
            };
            let tree = directories.get_directory_tree(id).await?;
            output::print_tree(&tree, format);
        }
        DirCommand::Find { query } => {
            let found = directories.find_directories(query).await?;
            let rows: Vec<DirectoryRow> = found.iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }
        DirCommand::List => {
            let all = directories.list_directories().await?;
            let rows: Vec<DirectoryRow> = all.iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
