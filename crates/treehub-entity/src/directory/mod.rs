//! Directory domain entities.

pub mod model;
pub mod tree;

pub use model::{Directory, DirectoryChildren, ROOT_NAME, is_reserved_name};
pub use tree::DirectoryNode;
