//! File version CLI commands.

use clap::{Args, Subcommand};
use uuid::Uuid;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_core::types::PageRequest;
use treehub_service::CreateVersionInput;

use super::rows::VersionRow;
use crate::output::{self, OutputFormat};

/// Arguments for version commands
#[derive(Debug, Args)]
pub struct VersionArgs {
    /// Version subcommand
    #[command(subcommand)]
    pub command: VersionCommand,
}

/// Version subcommands
#[derive(Debug, Subcommand)]
pub enum VersionCommand {
    /// Append a version and print the URL to upload it to
    Create {
        /// File ID
        file_id: Uuid,
        /// Content size in bytes
        #[arg(short, long)]
        size: i64,
        /// Name at upload time (defaults to the file's name)
        #[arg(short, long, default_value = "")]
        name: String,
        /// MIME type (guessed from the name when omitted)
        #[arg(short, long, default_value = "")]
        mime_type: String,
        /// Blob key (generated when omitted)
        #[arg(short, long)]
        key: Option<String>,
    },
    /// List a file's versions, newest first
    List {
        /// File ID
        file_id: Uuid,
        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: u64,
        /// Rows per page
        #[arg(short = 'n', long, default_value = "20")]
        page_length: u64,
    },
    /// Show one version
    Get {
        /// Version ID
        id: Uuid,
    },
    /// Print a signed download URL for a blob key
    Download {
        /// Blob key
        key: String,
    },
}

/// Execute version commands
pub async fn execute(
    args: &VersionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = super::open_services(config).await?;
    let versions = &services.versions;

    match &args.command {
        VersionCommand::Create {
            file_id,
            size,
            name,
            mime_type,
            key,
        } => {
            let (version, upload_url) = versions
                .create_file_version(CreateVersionInput {
                    file_id: *file_id,
                    name: name.clone(),
                    mime_type: mime_type.clone(),
                    size: *size,
                    key: key.clone(),
                })
                .await?;
            output::print_success(&format!("Version {} created", version.id));
            output::print_kv("Upload URL", &upload_url);
        }
        VersionCommand::List {
            file_id,
            page,
            page_length,
        } => {
            let page = PageRequest::new(*page, *page_length);
            let list = versions.get_file_versions(*file_id, Some(page)).await?;
            let rows: Vec<VersionRow> = list.iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }
        VersionCommand::Get { id } => {
            let version = versions
                .get_file_version(*id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Version {id} not found")))?;
            output::print_item(&VersionRow::from(&version), format);
        }
        VersionCommand::Download { key } => {
            let url = versions.request_file_download(key).await?;
            println!("{url}");
        }
    }

    Ok(())
}
