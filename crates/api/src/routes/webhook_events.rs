//! Route definitions for the `/webhook-events` audit resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::webhook_events;
use crate::state::AppState;

/// Routes mounted at `/webhook-events`.
///
/// ```text
/// GET /        -> list (?failed_only=true for the dead-letter set)
/// GET /{id}    -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(webhook_events::list))
        .route("/{id}", get(webhook_events::get_by_id))
}
