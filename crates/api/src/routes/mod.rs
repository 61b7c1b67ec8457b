pub mod auth;
pub mod client;
pub mod dashboard;
pub mod health;
pub mod reel;
pub mod webhook;
pub mod webhook_events;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public, cookie)
/// /auth/logout                                     logout (public, cookie)
/// /auth/me                                         current user
///
/// /client                                          list
/// /client/create                                   create (POST)
/// /client/{id}                                     get, update, delete
///
/// /reels                                           list
/// /reels/schedule-reel                             schedule (POST, multipart)
/// /reels/{id}                                      get
///
/// /dashboard                                       summary counters
///
/// /meta/webhook                                    verify (GET), receive (POST), public
///
/// /webhook-events                                  audit / dead-letter listing
/// /webhook-events/{id}                             get
/// ```
///
/// Everything except `/auth/login|refresh|logout` and `/meta/webhook`
/// requires a Bearer access token.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/client", client::router())
        .nest("/reels", reel::router())
        .nest("/dashboard", dashboard::router())
        .nest("/meta/webhook", webhook::router())
        .nest("/webhook-events", webhook_events::router())
}
