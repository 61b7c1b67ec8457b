//! Meta Graph API integration.
//!
//! - [`client`] -- thin `reqwest` wrapper around the Graph and resumable
//!   upload hosts.
//! - [`strategy`] -- the [`PlatformStrategy`] capability and the
//!   [`StrategyFactory`] that maps a client's identity to an implementation.
//! - [`instagram`] / [`facebook`] -- the two concrete strategies.
//! - [`webhook`] -- webhook handshake and payload types.

pub mod client;
pub mod error;
pub mod facebook;
pub mod instagram;
pub mod strategy;
pub mod webhook;

pub use client::{GraphClient, GraphConfig};
pub use error::PlatformError;
pub use strategy::{
    Credentials, PlatformStrategy, PublishResult, ReelPost, ScheduleOutcome, StrategyFactory,
    VideoFile,
};
