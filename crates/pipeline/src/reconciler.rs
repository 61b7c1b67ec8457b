//! Webhook reconciler.
//!
//! Applies "video published" deliveries to pending reels. Every delivery is
//! first recorded in `webhook_events`; the row ends up either processed
//! (with the number of reels it completed) or carrying the error, so a
//! delivery that could not be applied stays inspectable.

use cadence_core::error::CoreError;
use cadence_core::types::DbId;
use cadence_db::repositories::{ReelRepo, WebhookEventRepo};
use cadence_meta::webhook::{facebook_reel_url, VideoPublished, WebhookPayload};
use serde_json::Value;
use sqlx::PgPool;

use crate::error::PipelineError;

/// Result of applying one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Audit row id in `webhook_events`.
    pub event_id: DbId,
    /// Published-video events found in the delivery.
    pub events: usize,
    /// Reels moved to `PUBLISHED` by this delivery.
    pub matched: usize,
}

/// Applies webhook deliveries. Cheap to clone.
#[derive(Clone)]
pub struct WebhookReconciler {
    pool: PgPool,
}

impl WebhookReconciler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record and apply one delivery.
    ///
    /// Entries are processed sequentially in delivery order. On error the
    /// audit row keeps the message and the error is returned for logging.
    pub async fn handle_delivery(&self, payload: Value) -> Result<ReconcileReport, PipelineError> {
        let object_type = payload.get("object").and_then(Value::as_str);
        let event_id = WebhookEventRepo::record(&self.pool, object_type, &payload).await?;

        match self.apply(event_id, payload).await {
            Ok(report) => {
                WebhookEventRepo::mark_processed(&self.pool, event_id, report.matched as i32)
                    .await?;
                tracing::info!(
                    event_id,
                    events = report.events,
                    matched = report.matched,
                    "Webhook delivery processed"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(audit_err) =
                    WebhookEventRepo::mark_failed(&self.pool, event_id, &e.to_string()).await
                {
                    tracing::error!(event_id, error = %audit_err, "Failed to record webhook error");
                }
                Err(e)
            }
        }
    }

    async fn apply(&self, event_id: DbId, payload: Value) -> Result<ReconcileReport, PipelineError> {
        let payload: WebhookPayload = serde_json::from_value(payload).map_err(|e| {
            CoreError::Validation(format!("Malformed webhook payload: {e}"))
        })?;

        let mut report = ReconcileReport {
            event_id,
            events: 0,
            matched: 0,
        };
        for event in payload.published_videos() {
            report.events += 1;
            if self.reconcile_video(&event).await? {
                report.matched += 1;
            }
        }
        Ok(report)
    }

    /// Complete the reel backed by `event.video_id` if it is still pending.
    ///
    /// Returns `true` when this call performed the transition.
    pub async fn reconcile_video(&self, event: &VideoPublished) -> Result<bool, PipelineError> {
        let video_url = event
            .link
            .clone()
            .unwrap_or_else(|| facebook_reel_url(&event.video_id));

        let updated = ReelRepo::mark_published_by_container(
            &self.pool,
            &event.video_id,
            Some(&event.video_id),
            &video_url,
        )
        .await?;

        match updated {
            Some(reel) => {
                tracing::info!(
                    reel_id = reel.id,
                    video_id = %event.video_id,
                    video_url = %video_url,
                    "Reel published via webhook"
                );
                Ok(true)
            }
            None => {
                let known = ReelRepo::find_by_container_id(&self.pool, &event.video_id)
                    .await?
                    .is_some();
                tracing::debug!(
                    video_id = %event.video_id,
                    known,
                    "Webhook video matched no pending reel"
                );
                Ok(false)
            }
        }
    }
}
