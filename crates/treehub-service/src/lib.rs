//! # treehub-service
//!
//! The tree engine. [`DirectoryService`] keeps every node's materialized
//! ancestor chain correct across create, rename, move and delete;
//! [`ContentService`] and [`AggregateService`] answer subtree queries;
//! [`FileService`] and [`VersionService`] manage files and their blob-backed
//! versions.
//!
//! Services follow constructor injection: the store and blob store are
//! handed in as `Arc<dyn ..>` at construction time. [`TreeServices`] wires
//! a full set that shares one [`SubtreeLocks`] table.

pub mod cleanup;
pub mod content;
pub mod directory;
pub mod file;
pub mod names;
pub mod services;

pub use cleanup::{BlobReclaimer, ReclaimReport};
pub use content::{AggregateService, ContentService};
pub use directory::{DirectoryService, SubtreeLocks};
pub use file::{CreateFileInput, CreateVersionInput, FileService, VersionService};
pub use services::TreeServices;
