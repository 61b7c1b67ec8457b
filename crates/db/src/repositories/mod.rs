//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod client_repo;
pub mod dashboard_repo;
pub mod reel_repo;
pub mod refresh_token_repo;
pub mod user_repo;
pub mod webhook_event_repo;

pub use client_repo::ClientRepo;
pub use dashboard_repo::DashboardRepo;
pub use reel_repo::ReelRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use user_repo::UserRepo;
pub use webhook_event_repo::WebhookEventRepo;
