//! Audit record for platform webhook deliveries.

use cadence_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `webhook_events` table.
///
/// Rows with `processed_at IS NULL` or a non-null `error` are the
/// dead-letter set: deliveries that were acknowledged but not applied.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WebhookEvent {
    pub id: DbId,
    pub object_type: Option<String>,
    pub payload: serde_json::Value,
    pub received_at: Timestamp,
    pub processed_at: Option<Timestamp>,
    pub matched_reels: i32,
    pub error: Option<String>,
}
