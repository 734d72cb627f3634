//! Sorting types for directory content listings.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Field a content listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentSortField {
    /// Entry name.
    #[default]
    Name,
    /// Size in bytes of the current version (directories are 0).
    Size,
    /// Creation timestamp.
    CreatedAt,
    /// Last update timestamp.
    UpdatedAt,
}

/// A sort specification for `get_directory_contents`.
///
/// The direction only applies to directories when sorting by a field other
/// than `name`; see `ContentService` for the exact contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentSort {
    /// Field to sort by.
    #[serde(default)]
    pub field: ContentSortField,
    /// Requested direction, ascending when absent.
    #[serde(default)]
    pub direction: Option<SortDirection>,
}

impl ContentSort {
    /// Create a sort on `field` with an explicit direction.
    pub fn new(field: ContentSortField, direction: SortDirection) -> Self {
        Self {
            field,
            direction: Some(direction),
        }
    }

    /// Create a sort on `field` with no direction.
    pub fn by(field: ContentSortField) -> Self {
        Self {
            field,
            direction: None,
        }
    }

    /// Effective direction, defaulting to ascending.
    pub fn direction(&self) -> SortDirection {
        self.direction.unwrap_or_default()
    }
}
