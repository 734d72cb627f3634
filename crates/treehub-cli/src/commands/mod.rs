//! CLI command definitions and dispatch.

pub mod contents;
pub mod directory;
pub mod file;
pub mod migrate;
pub mod reap;
pub mod rows;
pub mod version;

use clap::{Parser, Subcommand};

use treehub_core::config::AppConfig;
use treehub_core::error::AppError;
use treehub_service::TreeServices;

use crate::output::OutputFormat;

/// TreeHub: a directory tree with materialized ancestor chains
#[derive(Debug, Parser)]
#[command(name = "treehub", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding default.toml and per-environment overlays
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Environment overlay to load
    #[arg(short, long, env = "TREEHUB_ENV", default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply database migrations
    Migrate,
    /// Create the root directory if it does not exist
    Seed,
    /// Directory management
    Dir(directory::DirArgs),
    /// List everything below a directory
    Ls(contents::LsArgs),
    /// Subtree size and entry count
    Du(contents::DuArgs),
    /// File management
    File(file::FileArgs),
    /// File version management
    Version(version::VersionArgs),
    /// Retry queued blob deletions once
    Reap,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = AppConfig::load_from(&self.config, &self.env)?;

        match &self.command {
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Seed => {
                let services = open_services(&config).await?;
                let root = services.directories.ensure_root().await?;
                crate::output::print_success(&format!("Root directory ready (id: {})", root.id));
                Ok(())
            }
            Commands::Dir(args) => directory::execute(args, &config, self.format).await,
            Commands::Ls(args) => contents::list(args, &config, self.format).await,
            Commands::Du(args) => contents::usage(args, &config, self.format).await,
            Commands::File(args) => file::execute(args, &config, self.format).await,
            Commands::Version(args) => version::execute(args, &config, self.format).await,
            Commands::Reap => reap::execute(&config).await,
        }
    }
}

/// Helper: open both stores and wire up the services
pub async fn open_services(config: &AppConfig) -> Result<TreeServices, AppError> {
    let store = treehub_database::open_store(&config.database).await?;
    let blobs = treehub_storage::open_blob_store(&config.storage).await?;
    Ok(TreeServices::new(store, blobs, &config.tree))
}
