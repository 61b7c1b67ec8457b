//! Dashboard aggregate models.

use serde::Serialize;
use sqlx::FromRow;

use super::reel::ReelListItem;

/// Headline counters shown on the operator dashboard.
#[derive(Debug, Clone, Copy, FromRow, Serialize, PartialEq, Eq)]
pub struct DashboardCounts {
    /// Clients holding both a token and a platform account id.
    pub active_clients: i64,
    pub scheduled_reels: i64,
    pub published_reels: i64,
    /// Reels whose scheduled date falls on the current UTC day.
    pub today_reels: i64,
}

/// Full dashboard payload.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub recent_reels: Vec<ReelListItem>,
}
