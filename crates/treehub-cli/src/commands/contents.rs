//! Subtree listing and usage commands.

use clap::{Args, ValueEnum};
use uuid::Uuid;

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_core::types::{ContentSort, ContentSortField, PageRequest, SortDirection};

use super::rows::EntryRow;
use crate::output::{self, OutputFormat};

/// Sort keys accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Entry name; files and directories interleaved
    Name,
    /// Current version size
    Size,
    /// Creation time
    CreatedAt,
    /// Last update time
    UpdatedAt,
}

impl From<SortKey> for ContentSortField {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Name => Self::Name,
            SortKey::Size => Self::Size,
            SortKey::CreatedAt => Self::CreatedAt,
            SortKey::UpdatedAt => Self::UpdatedAt,
        }
    }
}

/// Arguments for `ls`
#[derive(Debug, Args)]
pub struct LsArgs {
    /// Directory ID
    pub id: Uuid,
    /// Page number, starting at 1
    #[arg(short, long, default_value = "1")]
    pub page: u64,
    /// Rows per page (defaults to the configured page length)
    #[arg(short = 'n', long)]
    pub page_length: Option<u64>,
    /// Sort key
    #[arg(short, long, value_enum, default_value = "name")]
    pub sort: SortKey,
    /// Sort descending
    #[arg(long)]
    pub desc: bool,
}

/// Arguments for `du`
#[derive(Debug, Args)]
pub struct DuArgs {
    /// Directory ID
    pub id: Uuid,
}

/// List every file and directory below a directory
pub async fn list(args: &LsArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let services = super::open_services(config).await?;

    let page = PageRequest::new(
        args.page,
        args.page_length.unwrap_or(config.tree.default_page_length),
    );
    let direction = if args.desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    };
    let sort = ContentSort::new(args.sort.into(), direction);

    let rows = services
        .contents
        .get_directory_contents(args.id, Some(page), Some(sort))
        .await?;
    let rows: Vec<EntryRow> = rows.iter().map(Into::into).collect();
    output::print_list(&rows, format);
    Ok(())
}

/// Show entry count and sizes for a directory's subtree
pub async fn usage(args: &DuArgs, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let services = super::open_services(config).await?;
    let aggregates = &services.aggregates;

    let entries = aggregates.count_directory_children(args.id).await?;
    let total = aggregates.get_directory_size(args.id).await?;
    let current = aggregates.get_directory_current_size(args.id).await?;

    match format {
        OutputFormat::Table => {
            output::print_kv("Entries", &entries.to_string());
            output::print_kv("All versions (bytes)", &size_or_dash(total));
            output::print_kv("Current versions (bytes)", &size_or_dash(current));
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries": entries,
                "size": total,
                "currentSize": current,
            });
            println!("{json:#}");
        }
    }
    Ok(())
}

fn size_or_dash(size: Option<i64>) -> String {
    size.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
}
