//! Core business entities.

mod click;
mod link;

pub use click::{Click, NewClick};
pub use link::{Link, LinkPatch, NewLink};
