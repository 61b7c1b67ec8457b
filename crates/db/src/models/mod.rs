//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - Filter / update DTOs where the resource supports them

pub mod client;
pub mod dashboard;
pub mod reel;
pub mod refresh_token;
pub mod user;
pub mod webhook_event;
