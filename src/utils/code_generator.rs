//! Short code generation and validation.
//!
//! Generated codes are sampled from the 62-symbol alphanumeric alphabet at a
//! configurable length (default 7). Custom codes are caller-chosen and only
//! validated here — uniqueness is enforced by the store's atomic insert.

use rand::Rng;
use rand::distr::Alphanumeric;

use crate::error::AppError;
use serde_json::json;

/// Default length for generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Bounds for custom codes.
pub const MIN_CODE_LENGTH: usize = 1;
pub const MAX_CODE_LENGTH: usize = 20;

/// Codes reserved for service endpoints to prevent routing conflicts.
const RESERVED_CODES: &[&str] = &["api", "health", "static", "links", "stats", "admin"];

/// Generates a random candidate code of the given length.
///
/// Uniqueness is not guaranteed here; the caller checks the store and
/// retries on collision.
pub fn generate_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Validates a caller-supplied custom short code.
///
/// # Rules
///
/// - 1–20 characters
/// - ASCII letters, digits, hyphen, underscore
/// - not a reserved service path
///
/// # Errors
///
/// Returns [`AppError::Validation`] naming the violated rule.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if code.len() < MIN_CODE_LENGTH || code.len() > MAX_CODE_LENGTH {
        return Err(AppError::validation(
            "Custom code must be 1-20 characters",
            json!({ "provided_length": code.len() }),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation(
            "Custom code can only contain letters, digits, hyphens, and underscores",
            json!({ "code": code }),
        ));
    }

    if RESERVED_CODES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(code))
    {
        return Err(AppError::validation(
            "This code is reserved",
            json!({ "code": code }),
        ));
    }

    Ok(())
}
