//! Periodic cleanup of expired refresh tokens.
//!
//! Expired tokens are already rejected at refresh time; this job only keeps
//! the `refresh_tokens` table from growing with dead rows. Runs on a fixed
//! interval using `tokio::time::interval`.

use std::time::Duration;

use cadence_db::repositories::RefreshTokenRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the refresh-token cleanup loop until `cancel` is triggered.
pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Refresh token cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Refresh token cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match RefreshTokenRepo::delete_expired(&pool).await {
                    Ok(deleted) => {
                        if deleted > 0 {
                            tracing::info!(deleted, "Token cleanup: purged expired tokens");
                        } else {
                            tracing::debug!("Token cleanup: no rows to purge");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Token cleanup: cleanup failed");
                    }
                }
            }
        }
    }
}
