//! Blob key validation and generation.

use treehub_core::error::AppError;
use treehub_core::result::AppResult;

/// Longest key accepted.
pub const MAX_KEY_LENGTH: usize = 512;

/// Check that `key` is safe to use as an object name and inside a URL path.
///
/// Keys are `/`-separated segments of ASCII letters, digits, `-`, `_` and
/// `.`; empty segments and `.`/`..` segments are rejected.
pub fn validate_key(key: &str) -> AppResult<()> {
    if key.is_empty() || key.len() > MAX_KEY_LENGTH {
        return Err(AppError::validation(format!(
            "Blob key must be 1..={MAX_KEY_LENGTH} bytes"
        )));
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(AppError::validation(format!("Invalid blob key: {key}")));
        }
        if !segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            return Err(AppError::validation(format!("Invalid blob key: {key}")));
        }
    }
    Ok(())
}

/// Generate a fresh key for a file named `name`, keeping its extension.
pub fn generate_key(name: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{id}.{}", ext.to_ascii_lowercase()),
        None => id,
    }
}
