//! Link password hashing.
//!
//! Passwords protecting individual links are stored as Argon2id PHC strings:
//! salted, one-way, and verified in constant time by the argon2 crate.
//! Plaintext never reaches the store.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;
use serde_json::json;

/// Hashes a password with Argon2id and a fresh random salt.
pub fn hash(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal("Failed to hash password", json!({ "reason": e.to_string() })))
}

/// Verifies a password against a stored PHC string.
///
/// A malformed stored hash is an error; a mismatch is `Ok(false)`.
pub fn verify(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        AppError::internal("Malformed password hash", json!({ "reason": e.to_string() }))
    })?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hashes a caller-supplied password if one was given.
///
/// Empty strings count as "no password" so clients cannot accidentally
/// create a link guarded by an empty credential.
pub fn hash_if_present(password: Option<&str>) -> Result<Option<String>, AppError> {
    match password {
        Some(p) if !p.is_empty() => hash(p).map(Some),
        _ => Ok(None),
    }
}
