//! Repository for the `reels` table.
//!
//! Every transition out of `SCHEDULED` is a guarded UPDATE
//! (`... WHERE status = 'SCHEDULED'`). Whoever completes a reel first wins;
//! later attempts match no row and get `None` back.

use cadence_core::pagination::PageRequest;
use cadence_core::social::ReelStatus;
use cadence_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::like_pattern;
use crate::models::reel::{CreateReel, Reel, ReelFilter, ReelListItem};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, container_id, title, description, scheduled_date, status, \
                       needs_local_publish, claimed_at, media_id, video_url, failure_reason, \
                       published_at, created_at, updated_at";

/// Columns of [`ReelListItem`], selected from `reels r LEFT JOIN clients c`.
const LIST_COLUMNS: &str = "r.id, r.client_id, r.container_id, r.title, r.description, \
                            r.scheduled_date, r.status, r.video_url, r.failure_reason, \
                            r.published_at, r.created_at, c.name AS client_name, \
                            c.username AS client_username, c.social_identity";

/// Shared WHERE clause for list and count. `$1` search pattern, `$2` status,
/// `$3` identity; each may be NULL to skip the filter.
const LIST_FILTER: &str = "($1::text IS NULL OR r.title ILIKE $1 OR r.description ILIKE $1)
                           AND ($2::text IS NULL OR r.status = $2)
                           AND ($3::text IS NULL OR c.social_identity = $3)";

/// Provides persistence for scheduled reels.
pub struct ReelRepo;

impl ReelRepo {
    /// Insert a new `SCHEDULED` reel for a freshly created container.
    ///
    /// A second insert for the same container violates `uq_reels_container_id`.
    pub async fn create(pool: &PgPool, input: &CreateReel) -> Result<Reel, sqlx::Error> {
        let query = format!(
            "INSERT INTO reels (client_id, container_id, title, description, scheduled_date, status,
                                needs_local_publish)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reel>(&query)
            .bind(input.client_id)
            .bind(&input.container_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.scheduled_date)
            .bind(ReelStatus::Scheduled.as_str())
            .bind(input.needs_local_publish)
            .fetch_one(pool)
            .await
    }

    /// Find a reel by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Reel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reels WHERE id = $1");
        sqlx::query_as::<_, Reel>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a reel by its platform container id.
    pub async fn find_by_container_id(
        pool: &PgPool,
        container_id: &str,
    ) -> Result<Option<Reel>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM reels WHERE container_id = $1");
        sqlx::query_as::<_, Reel>(&query)
            .bind(container_id)
            .fetch_optional(pool)
            .await
    }

    /// List one page of reels joined with their client, latest schedule
    /// first, plus the total number of matching rows.
    pub async fn list(
        pool: &PgPool,
        filter: &ReelFilter,
        page: PageRequest,
    ) -> Result<(Vec<ReelListItem>, i64), sqlx::Error> {
        let pattern = like_pattern(filter.search.as_deref());
        let status = filter.status.map(|s| s.as_str());
        let identity = filter.social_identity.map(|i| i.as_str());

        let query = format!(
            "SELECT {LIST_COLUMNS}
             FROM reels r LEFT JOIN clients c ON c.id = r.client_id
             WHERE {LIST_FILTER}
             ORDER BY r.scheduled_date DESC, r.id DESC
             LIMIT $4 OFFSET $5"
        );
        let rows = sqlx::query_as::<_, ReelListItem>(&query)
            .bind(&pattern)
            .bind(status)
            .bind(identity)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!(
            "SELECT COUNT(*) FROM reels r LEFT JOIN clients c ON c.id = r.client_id
             WHERE {LIST_FILTER}"
        );
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .bind(status)
            .bind(identity)
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }

    /// The `limit` most recently created reels, joined with their client.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<ReelListItem>, sqlx::Error> {
        let query = format!(
            "SELECT {LIST_COLUMNS}
             FROM reels r LEFT JOIN clients c ON c.id = r.client_id
             ORDER BY r.created_at DESC, r.id DESC
             LIMIT $1"
        );
        sqlx::query_as::<_, ReelListItem>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Hand a scheduled reel over to the local arranger.
    ///
    /// Returns `false` if the reel already left `SCHEDULED`.
    pub async fn mark_local_publish(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE reels SET needs_local_publish = true WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(ReelStatus::Scheduled.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically claim up to `limit` reels the arranger must publish by `now`.
    ///
    /// A claim older than `stale_before` is considered abandoned (the process
    /// that took it died) and may be claimed again. Uses
    /// `FOR UPDATE SKIP LOCKED` so concurrent sweeps never claim the same row.
    pub async fn claim_due(
        pool: &PgPool,
        now: Timestamp,
        stale_before: Timestamp,
        limit: i64,
    ) -> Result<Vec<Reel>, sqlx::Error> {
        let query = format!(
            "UPDATE reels SET claimed_at = $1
             WHERE id IN (
                 SELECT id FROM reels
                 WHERE status = $2
                   AND needs_local_publish
                   AND scheduled_date <= $1
                   AND (claimed_at IS NULL OR claimed_at < $3)
                 ORDER BY scheduled_date ASC
                 LIMIT $4
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reel>(&query)
            .bind(now)
            .bind(ReelStatus::Scheduled.as_str())
            .bind(stale_before)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Drop a claim so the next sweep picks the reel up again.
    pub async fn release_claim(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE reels SET claimed_at = NULL WHERE id = $1 AND status = $2")
                .bind(id)
                .bind(ReelStatus::Scheduled.as_str())
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Earliest `scheduled_date` among unclaimed reels awaiting local publish.
    pub async fn next_due_at(pool: &PgPool) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MIN(scheduled_date) FROM reels
             WHERE status = $1 AND needs_local_publish AND claimed_at IS NULL",
        )
        .bind(ReelStatus::Scheduled.as_str())
        .fetch_one(pool)
        .await
    }

    /// Transition `SCHEDULED -> PUBLISHED` by reel id.
    ///
    /// Returns `None` (and writes nothing) if the reel is already terminal.
    pub async fn mark_published(
        pool: &PgPool,
        id: DbId,
        media_id: Option<&str>,
        video_url: &str,
    ) -> Result<Option<Reel>, sqlx::Error> {
        let query = format!(
            "UPDATE reels SET
                status = $4,
                media_id = COALESCE($2, media_id),
                video_url = $3,
                published_at = NOW(),
                claimed_at = NULL,
                needs_local_publish = false
             WHERE id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reel>(&query)
            .bind(id)
            .bind(media_id)
            .bind(video_url)
            .bind(ReelStatus::Published.as_str())
            .bind(ReelStatus::Scheduled.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Transition `SCHEDULED -> PUBLISHED` by container id (webhook path).
    ///
    /// Returns `None` if no scheduled reel backs this container.
    pub async fn mark_published_by_container(
        pool: &PgPool,
        container_id: &str,
        media_id: Option<&str>,
        video_url: &str,
    ) -> Result<Option<Reel>, sqlx::Error> {
        let query = format!(
            "UPDATE reels SET
                status = $4,
                media_id = COALESCE($2, media_id),
                video_url = $3,
                published_at = NOW(),
                claimed_at = NULL,
                needs_local_publish = false
             WHERE container_id = $1 AND status = $5
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reel>(&query)
            .bind(container_id)
            .bind(media_id)
            .bind(video_url)
            .bind(ReelStatus::Published.as_str())
            .bind(ReelStatus::Scheduled.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Transition `SCHEDULED -> FAILED`, recording why.
    ///
    /// Returns `None` if the reel is already terminal.
    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        reason: &str,
    ) -> Result<Option<Reel>, sqlx::Error> {
        let query = format!(
            "UPDATE reels SET
                status = $3,
                failure_reason = $2,
                claimed_at = NULL,
                needs_local_publish = false
             WHERE id = $1 AND status = $4
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reel>(&query)
            .bind(id)
            .bind(reason)
            .bind(ReelStatus::Failed.as_str())
            .bind(ReelStatus::Scheduled.as_str())
            .fetch_optional(pool)
            .await
    }
}
