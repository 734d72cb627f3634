//! Core traits defined in `treehub-core` and implemented by other crates.

pub mod storage;

pub use storage::{BlobStore, SignedUrlMethod};
