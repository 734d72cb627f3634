//! Tree engine limits.

use serde::{Deserialize, Serialize};

/// Limits and defaults applied by the directory and listing services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Upper bound on rows rewritten by one move or removed by one delete.
    /// `0` disables the check.
    #[serde(default)]
    pub max_cascade_rows: usize,
    /// How many times a move is recomputed after an optimistic conflict.
    #[serde(default = "default_max_move_retries")]
    pub max_move_retries: u32,
    /// Page length used when a listing request omits one.
    #[serde(default = "default_page_length")]
    pub default_page_length: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_cascade_rows: 0,
            max_move_retries: default_max_move_retries(),
            default_page_length: default_page_length(),
        }
    }
}

fn default_max_move_retries() -> u32 {
    3
}

fn default_page_length() -> u64 {
    20
}
