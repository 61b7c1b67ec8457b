//! Handlers for the Meta webhook endpoint.
//!
//! Meta retries deliveries that are not acknowledged quickly, so `receive`
//! answers 200 before any processing and hands the payload to the
//! [`WebhookReconciler`](cadence_pipeline::WebhookReconciler) on a spawned task.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use cadence_meta::webhook::{verify_subscription, VerifyQuery};
use serde_json::Value;

use crate::state::AppState;

/// Literal acknowledgement body Meta expects.
pub const EVENT_RECEIVED: &str = "EVENT_RECEIVED";

/// GET /api/v1/meta/webhook
///
/// Subscription handshake. Echoes `hub.challenge` when the verify token
/// matches, otherwise 403.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> (StatusCode, String) {
    match verify_subscription(&query, &state.config.meta_verify_token) {
        Some(challenge) => {
            tracing::info!("Webhook subscription verified");
            (StatusCode::OK, challenge)
        }
        None => {
            tracing::warn!(mode = ?query.mode, "Webhook verification rejected");
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
    }
}

/// POST /api/v1/meta/webhook
///
/// Always acknowledges. Bodies that are not JSON are kept as a string so
/// they still land in the audit table.
pub async fn receive(State(state): State<AppState>, body: Bytes) -> (StatusCode, &'static str) {
    let payload = serde_json::from_slice::<Value>(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()));

    let reconciler = state.reconciler.clone();
    tokio::spawn(async move {
        match reconciler.handle_delivery(payload).await {
            Ok(report) => tracing::info!(
                event_id = report.event_id,
                events = report.events,
                matched = report.matched,
                "Webhook delivery processed"
            ),
            Err(e) => tracing::error!(error = %e, "Webhook delivery failed"),
        }
    });

    (StatusCode::OK, EVENT_RECEIVED)
}
