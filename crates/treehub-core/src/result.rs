//! Result alias shared by every TreeHub crate.

use crate::error::AppError;

/// `Result` specialised to [`AppError`], returned by services, stores and blob adapters.
pub type AppResult<T> = Result<T, AppError>;
