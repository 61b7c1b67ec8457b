//! Handler for the operator dashboard.

use axum::extract::State;
use axum::Json;
use cadence_core::types::Timestamp;
use cadence_db::models::dashboard::DashboardSummary;
use cadence_db::repositories::{DashboardRepo, ReelRepo};
use chrono::{Duration, Utc};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Number of reels shown in the "recent" panel.
const RECENT_REELS: i64 = 5;

/// GET /api/v1/dashboard
pub async fn summary(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<DataResponse<DashboardSummary>>> {
    let (day_start, day_end) = utc_day_bounds(Utc::now());
    let counts = DashboardRepo::counts(&state.pool, day_start, day_end).await?;
    let recent_reels = ReelRepo::list_recent(&state.pool, RECENT_REELS).await?;

    Ok(Json(DataResponse {
        data: DashboardSummary {
            counts,
            recent_reels,
        },
    }))
}

/// Midnight-to-midnight UTC bounds of the day containing `now`.
fn utc_day_bounds(now: Timestamp) -> (Timestamp, Timestamp) {
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now);
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn day_bounds_cover_the_utc_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 17, 45, 12).unwrap();
        let (start, end) = utc_day_bounds(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }
}
