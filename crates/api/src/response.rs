//! Shared response envelope types for API handlers.
//!
//! Single resources use a `{ "data": ... }` envelope. Paginated listings use
//! [`cadence_core::pagination::Paginated`] (`{ "data": [...], "pagination": {...} }`).

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
