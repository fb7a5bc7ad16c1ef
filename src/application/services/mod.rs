pub mod auth_service;
pub mod link_service;
pub mod resolve_service;
pub mod stats_service;

pub use auth_service::AuthService;
pub use link_service::{CreateLink, LinkService};
pub use resolve_service::{ResolveRequest, ResolveService, Resolved};
pub use stats_service::{LinkStats, StatsService};
