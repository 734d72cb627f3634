//! # treehub-entity
//!
//! Row models for TreeHub. Every struct in this crate represents a table
//! row or a value assembled from rows. Row structs derive `sqlx::FromRow`
//! so the PostgreSQL store can decode them directly.

pub mod blob;
pub mod content;
pub mod directory;
pub mod file;

pub use blob::PendingBlobDeletion;
pub use content::{ContentKind, ContentRow};
pub use directory::{Directory, DirectoryChildren, DirectoryNode, ROOT_NAME, is_reserved_name};
pub use file::{File, FileVersion};
