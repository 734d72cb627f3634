//! Files and their versions.

pub mod service;
pub mod version;

pub use service::{CreateFileInput, FileService};
pub use version::{CreateVersionInput, VersionService};
