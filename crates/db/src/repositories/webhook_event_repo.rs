//! Repository for the `webhook_events` audit table.

use cadence_core::pagination::PageRequest;
use cadence_core::types::DbId;
use sqlx::PgPool;

use crate::models::webhook_event::WebhookEvent;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, object_type, payload, received_at, processed_at, matched_reels, error";

/// Persists every webhook delivery and its processing outcome.
pub struct WebhookEventRepo;

impl WebhookEventRepo {
    /// Record a raw delivery as received. Returns the new row id.
    pub async fn record(
        pool: &PgPool,
        object_type: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO webhook_events (object_type, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(object_type)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Mark a delivery as fully processed.
    pub async fn mark_processed(
        pool: &PgPool,
        id: DbId,
        matched_reels: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE webhook_events SET processed_at = NOW(), matched_reels = $2, error = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(matched_reels)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record why a delivery could not be applied.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE webhook_events SET processed_at = NOW(), error = $2 WHERE id = $1")
            .bind(id)
            .bind(error)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Find a delivery by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WebhookEvent>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM webhook_events WHERE id = $1");
        sqlx::query_as::<_, WebhookEvent>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Page through deliveries, newest first. With `failed_only`, return
    /// only the dead-letter set (errored or never finished).
    pub async fn list(
        pool: &PgPool,
        failed_only: bool,
        page: PageRequest,
    ) -> Result<(Vec<WebhookEvent>, i64), sqlx::Error> {
        const FILTER: &str = "(NOT $1 OR error IS NOT NULL OR processed_at IS NULL)";

        let query = format!(
            "SELECT {COLUMNS} FROM webhook_events
             WHERE {FILTER}
             ORDER BY received_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query_as::<_, WebhookEvent>(&query)
            .bind(failed_only)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM webhook_events WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(failed_only)
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }
}
