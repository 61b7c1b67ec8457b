//! Repository for the `clients` table.

use cadence_core::pagination::PageRequest;
use cadence_core::social::ReelStatus;
use cadence_core::types::DbId;
use sqlx::PgPool;

use crate::like_pattern;
use crate::models::client::{Client, ClientFilter, CreateClient, UpdateClient};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, social_identity, name, username, description, access_token, \
                       account_id, created_at, updated_at";

/// Shared WHERE clause for list and count. `$1` is the ILIKE pattern, `$2`
/// the identity; either may be NULL to skip that filter.
const FILTER: &str = "($1::text IS NULL
                        OR name ILIKE $1
                        OR username ILIKE $1
                        OR description ILIKE $1)
                      AND ($2::text IS NULL OR social_identity = $2)";

/// Provides CRUD and search operations for client accounts.
pub struct ClientRepo;

impl ClientRepo {
    /// Insert a new client, returning the created row.
    ///
    /// A duplicate (identity, name, username) triple violates
    /// `uq_clients_identity_name_username`.
    pub async fn create(pool: &PgPool, input: &CreateClient) -> Result<Client, sqlx::Error> {
        let query = format!(
            "INSERT INTO clients (social_identity, name, username, description, access_token, account_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(input.social_identity.as_str())
            .bind(&input.name)
            .bind(&input.username)
            .bind(&input.description)
            .bind(&input.access_token)
            .bind(&input.account_id)
            .fetch_one(pool)
            .await
    }

    /// Find a client by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Client>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clients WHERE id = $1");
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Whether another client in the same identity scope already uses this
    /// name + username pair. `exclude_id` skips the row being edited.
    pub async fn name_taken(
        pool: &PgPool,
        social_identity: &str,
        name: &str,
        username: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                 SELECT 1 FROM clients
                 WHERE social_identity = $1 AND name = $2 AND username = $3
                   AND ($4::bigint IS NULL OR id <> $4)
             )",
        )
        .bind(social_identity)
        .bind(name)
        .bind(username)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    /// List one page of clients matching `filter`, newest first, plus the
    /// total number of matching rows.
    pub async fn list(
        pool: &PgPool,
        filter: &ClientFilter,
        page: PageRequest,
    ) -> Result<(Vec<Client>, i64), sqlx::Error> {
        let pattern = like_pattern(filter.search.as_deref());
        let identity = filter.social_identity.map(|i| i.as_str());

        let query = format!(
            "SELECT {COLUMNS} FROM clients
             WHERE {FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, Client>(&query)
            .bind(&pattern)
            .bind(identity)
            .bind(page.limit)
            .bind(page.offset())
            .fetch_all(pool)
            .await?;

        let count_query = format!("SELECT COUNT(*) FROM clients WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_query)
            .bind(&pattern)
            .bind(identity)
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }

    /// Update display fields. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateClient,
    ) -> Result<Option<Client>, sqlx::Error> {
        let query = format!(
            "UPDATE clients SET
                name = COALESCE($2, name),
                username = COALESCE($3, username),
                description = COALESCE($4, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Client>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.username)
            .bind(&input.description)
            .fetch_optional(pool)
            .await
    }

    /// Number of reels for this client still waiting to be published.
    pub async fn pending_reel_count(pool: &PgPool, id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reels WHERE client_id = $1 AND status = $2")
            .bind(id)
            .bind(ReelStatus::Scheduled.as_str())
            .fetch_one(pool)
            .await
    }

    /// Permanently delete a client unless it still has scheduled reels.
    ///
    /// Returns `true` if a row was removed. The pending-reel guard is part of
    /// the DELETE so a reel scheduled concurrently blocks the deletion. Reels
    /// that referenced the client keep their history with `client_id = NULL`.
    pub async fn delete_if_idle(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM clients
             WHERE id = $1
               AND NOT EXISTS (SELECT 1 FROM reels WHERE client_id = $1 AND status = $2)",
        )
        .bind(id)
        .bind(ReelStatus::Scheduled.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
