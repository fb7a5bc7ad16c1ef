//! Shared utilities.

pub mod code_generator;
pub mod device;
pub mod password;
pub mod url_normalizer;
