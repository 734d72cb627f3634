//! File management CLI commands.

use clap::{Args, Subcommand};
use uuid::Uuid;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_service::CreateFileInput;

use super::rows::FileRow;
use crate::output::{self, OutputFormat};

/// Arguments for file commands
#[derive(Debug, Args)]
pub struct FileArgs {
    /// File subcommand
    #[command(subcommand)]
    pub command: FileCommand,
}

/// File subcommands
#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Show one file
    Get {
        /// File ID
        id: Uuid,
    },
    /// Register a file and print the URL to upload its first version to
    Create {
        /// File name
        #[arg(short, long)]
        name: String,
        /// Containing directory ID
        #[arg(short, long)]
        directory_id: Uuid,
        /// Content size in bytes
        #[arg(short, long)]
        size: i64,
        /// MIME type (guessed from the name when omitted)
        #[arg(short, long, default_value = "")]
        mime_type: String,
        /// Blob key (generated when omitted)
        #[arg(short, long)]
        key: Option<String>,
    },
    /// Move a file to another directory
    Move {
        /// File ID
        id: Uuid,
        /// Target directory ID
        #[arg(short, long)]
        directory_id: Uuid,
    },
    /// Rename a file
    Rename {
        /// File ID
        id: Uuid,
        /// New name
        #[arg(short, long)]
        name: String,
    },
    /// Delete a file and all of its versions
    Delete {
        /// File ID
        id: Uuid,
    },
}

/// Execute file commands
pub async fn execute(
    args: &FileArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::open_services(config).await?;
    let files = &services.files;

    match &args.command {
        FileCommand::Get { id } => {
            let file = files
                .get_file(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
            output::print_item(&FileRow::from(&file), format);
        }
        FileCommand::Create {
            name,
            directory_id,
            size,
            mime_type,
            key,
        } => {
            let (file, upload_url) = files
                .create_file(CreateFileInput {
                    name: name.clone(),
                    directory_id: *directory_id,
                    mime_type: mime_type.clone(),
                    size: *size,
                    key: key.clone(),
                })
                .await?;
            output::print_success(&format!("File '{}' created (id: {})", file.name, file.id));
            output::print_kv("Upload URL", &upload_url);
        }
        FileCommand::Move { id, directory_id } => {
            files.move_file(*id, *directory_id).await?;
            output::print_success(&format!("File {id} moved to {directory_id}"));
        }
        FileCommand::Rename { id, name } => {
            files.rename_file(*id, name).await?;
            output::print_success(&format!("File {id} renamed to '{name}'"));
        }
        FileCommand::Delete { id } => {
            files.delete_file(*id).await?;
            output::print_success(&format!("File {id} deleted"));
        }
    }

    Ok(())
}
