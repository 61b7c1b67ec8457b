//! Repository for the `refresh_tokens` table.
//!
//! Every write to a user's token set takes a row lock on the owning `users`
//! row first, so logins, refreshes and revocations for one user are applied
//! one after another and never interleave.

use cadence_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::refresh_token::{NewRefreshToken, RefreshToken};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

/// Provides refresh-token set operations.
pub struct RefreshTokenRepo;

impl RefreshTokenRepo {
    /// Find a stored token by its SHA-256 hash, regardless of expiry.
    pub async fn find_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM refresh_tokens WHERE token_hash = $1");
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// List a user's current token set, oldest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<RefreshToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM refresh_tokens WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, RefreshToken>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Count a user's stored tokens.
    pub async fn count_for_user(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Add `new` to the user's set on login.
    ///
    /// `presented_hash` is the hash of the cookie the browser sent, if any.
    /// A presented token that is still stored is dropped from the user's set.
    /// One that is stored nowhere may have been stolen and replayed, so the
    /// user's whole set is cleared before `new` goes in.
    ///
    /// Returns `true` when the set was cleared.
    pub async fn issue_for_login(
        pool: &PgPool,
        user_id: DbId,
        presented_hash: Option<&str>,
        new: &NewRefreshToken,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let mut cleared = false;
        if let Some(hash) = presented_hash {
            let known: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM refresh_tokens WHERE token_hash = $1)",
            )
            .bind(hash)
            .fetch_one(&mut *tx)
            .await?;

            if known {
                sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token_hash = $2")
                    .bind(user_id)
                    .bind(hash)
                    .execute(&mut *tx)
                    .await?;
            } else {
                sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&mut *tx)
                    .await?;
                cleared = true;
            }
        }

        insert(&mut tx, user_id, new).await?;
        tx.commit().await?;
        Ok(cleared)
    }

    /// Swap `old_hash` for `new` in the user's set.
    ///
    /// Returns `false` and writes nothing when `old_hash` is no longer in
    /// the set, i.e. another request already consumed it.
    pub async fn rotate(
        pool: &PgPool,
        user_id: DbId,
        old_hash: &str,
        new: &NewRefreshToken,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let consumed =
            sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND token_hash = $2")
                .bind(user_id)
                .bind(old_hash)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;
        if !consumed {
            tx.rollback().await?;
            return Ok(false);
        }

        insert(&mut tx, user_id, new).await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Remove a single token. Returns the owner when a row was removed.
    pub async fn delete_by_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING user_id")
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Revoke every token a user holds. Returns the number removed.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        lock_user(&mut tx, user_id).await?;

        let removed = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed)
    }

    /// Delete expired tokens. Returns the count of deleted rows.
    pub async fn delete_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Serialize writers of one user's token set on the `users` row.
async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: DbId) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    user_id: DbId,
    token: &NewRefreshToken,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
