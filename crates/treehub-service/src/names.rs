//! Name rules shared by directories and files.

use treehub_core::error::AppError;
use treehub_core::result::AppResult;
use treehub_entity::is_reserved_name;

/// Longest accepted name, in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Reject blank, oversized or control-character names.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "Name exceeds {MAX_NAME_LENGTH} bytes"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(AppError::validation("Name contains control characters"));
    }
    Ok(())
}

/// [`validate_name`] plus the reserved root name check for directories.
pub fn validate_directory_name(name: &str) -> AppResult<()> {
    if is_reserved_name(name) {
        return Err(AppError::reserved_name(format!(
            "Directory name '{name}' is reserved"
        )));
    }
    validate_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treehub_core::error::ErrorKind;

    #[test]
    fn test_directory_names() {
        assert!(validate_directory_name("Projects").is_ok());
        assert_eq!(
            validate_directory_name("ROOT").unwrap_err().kind,
            ErrorKind::ReservedName
        );
        assert_eq!(
            validate_directory_name("   ").unwrap_err().kind,
            ErrorKind::Validation
        );
        assert!(validate_name(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
        assert!(validate_name("tab\there").is_err());
    }
}
