//! Route definitions for the Meta webhook endpoint.

use axum::routing::get;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// Routes mounted at `/meta/webhook`. Both are public; Meta calls them.
///
/// ```text
/// GET  /   -> verify (subscription handshake)
/// POST /   -> receive
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(webhook::verify).post(webhook::receive))
}
