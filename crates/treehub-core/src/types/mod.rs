//! Core type definitions used across the TreeHub workspace.

pub mod pagination;
pub mod sorting;

pub use pagination::PageRequest;
pub use sorting::{ContentSort, ContentSortField, SortDirection};
