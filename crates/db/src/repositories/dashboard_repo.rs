//! Aggregate queries backing the operator dashboard.

use cadence_core::social::ReelStatus;
use cadence_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::dashboard::DashboardCounts;

/// Read-only dashboard aggregates.
pub struct DashboardRepo;

impl DashboardRepo {
    /// Headline counters. `day_start..day_end` bounds "today".
    pub async fn counts(
        pool: &PgPool,
        day_start: Timestamp,
        day_end: Timestamp,
    ) -> Result<DashboardCounts, sqlx::Error> {
        sqlx::query_as::<_, DashboardCounts>(
            "SELECT
                (SELECT COUNT(*) FROM clients
                  WHERE access_token <> '' AND account_id <> '') AS active_clients,
                (SELECT COUNT(*) FROM reels WHERE status = $1) AS scheduled_reels,
                (SELECT COUNT(*) FROM reels WHERE status = $2) AS published_reels,
                (SELECT COUNT(*) FROM reels
                  WHERE scheduled_date >= $3 AND scheduled_date < $4) AS today_reels",
        )
        .bind(ReelStatus::Scheduled.as_str())
        .bind(ReelStatus::Published.as_str())
        .bind(day_start)
        .bind(day_end)
        .fetch_one(pool)
        .await
    }
}
