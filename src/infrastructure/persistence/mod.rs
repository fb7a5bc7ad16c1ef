pub mod memory;
pub mod pg_click_repository;
pub mod pg_link_repository;
pub mod pg_token_repository;
mod retry;

pub use memory::{MemoryClickRepository, MemoryLinkRepository, MemoryStore, MemoryTokenRepository};
pub use pg_click_repository::PgClickRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_token_repository::PgTokenRepository;
