pub mod create_link;
pub mod health;
pub mod stats;
pub mod update_link;

pub use create_link::{CreateLinkRequest, LinkResponse};
pub use stats::{StatsQuery, StatsResponse};
pub use update_link::UpdateLinkRequest;
