//! Read side: subtree listings and aggregates.

pub mod aggregate;
pub mod listing;

pub use aggregate::AggregateService;
pub use listing::{ContentService, sort_contents};
