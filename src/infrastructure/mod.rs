pub mod cache;
pub mod persistence;
