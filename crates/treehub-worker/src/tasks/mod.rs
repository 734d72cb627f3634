//! Built-in periodic tasks.

pub mod reaper;

pub use reaper::BlobReaper;
