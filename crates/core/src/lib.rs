//! Domain types shared by every Cadence crate.
//!
//! This crate has zero internal dependencies and performs no I/O so it can
//! be used from the repository layer, the publishing pipeline and the HTTP
//! server alike.

pub mod error;
pub mod pagination;
pub mod scheduling;
pub mod social;
pub mod types;
