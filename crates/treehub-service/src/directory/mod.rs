//! Directory maintenance: creation, rename, subtree move and delete.

pub mod lock;
pub mod rebase;
pub mod service;
pub mod tree;

pub use lock::{SubtreeGuard, SubtreeLocks};
pub use rebase::{plan_move, rebase_chain};
pub use service::DirectoryService;
