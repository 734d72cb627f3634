//! Pagination types for listing operations.

use serde::{Deserialize, Serialize};

/// Default page length for listings.
pub const DEFAULT_PAGE_LENGTH: u64 = 20;

/// 1-indexed page request.
///
/// Listings are sliced in memory after sorting, so an out-of-range page is
/// simply an empty result rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Page number (1-based). Page `0` holds no items.
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_page_length")]
    pub page_length: u64,
}

impl PageRequest {
    /// Create a new page request.
    pub fn new(page: u64, page_length: u64) -> Self {
        Self { page, page_length }
    }

    /// Index of the first item on this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_length)
    }

    /// Maximum number of items on this page.
    pub fn limit(&self) -> u64 {
        if self.page == 0 {
            0
        } else {
            self.page_length
        }
    }

    /// Slice an already ordered sequence down to this page.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit()).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_length: DEFAULT_PAGE_LENGTH,
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_page_length() -> u64 {
    DEFAULT_PAGE_LENGTH
}
