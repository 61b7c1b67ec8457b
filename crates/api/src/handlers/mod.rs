pub mod auth;
pub mod client;
pub mod dashboard;
pub mod reel;
pub mod webhook;
pub mod webhook_events;
