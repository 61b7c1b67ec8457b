//! Route definitions for the `/reels` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::reel;
use crate::state::AppState;

/// Routes mounted at `/reels`.
///
/// ```text
/// GET  /                -> list
/// POST /schedule-reel   -> schedule (multipart)
/// GET  /{id}            -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(reel::list))
        .route("/schedule-reel", post(reel::schedule))
        .route("/{id}", get(reel::get_by_id))
}
