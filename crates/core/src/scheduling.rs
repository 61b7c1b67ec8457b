//! Scheduling rules for reel publication.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::Timestamp;

/// How far in the past a requested publish time may be before the request is
/// rejected. Covers clock skew between the operator's browser and the server.
pub const PAST_SCHEDULE_GRACE_MINS: i64 = 5;

/// Facebook only accepts `scheduled_publish_time` values at least this far in
/// the future. Anything sooner is published immediately instead.
pub const FACEBOOK_MIN_SCHEDULE_LEAD_MINS: i64 = 10;

/// Maximum caption length accepted by the Graph API for reels.
pub const MAX_CAPTION_CHARS: usize = 2200;

/// Reject publish times that lie further in the past than the grace window.
pub fn validate_scheduled_date(scheduled: Timestamp, now: Timestamp) -> Result<(), CoreError> {
    if scheduled < now - Duration::minutes(PAST_SCHEDULE_GRACE_MINS) {
        return Err(CoreError::Validation(format!(
            "scheduled_date {} is in the past",
            scheduled.to_rfc3339()
        )));
    }
    Ok(())
}

/// Whether Facebook can hold the reel and publish it itself at `scheduled`.
pub fn facebook_supports_native_schedule(scheduled: Timestamp, now: Timestamp) -> bool {
    scheduled - now >= Duration::minutes(FACEBOOK_MIN_SCHEDULE_LEAD_MINS)
}

/// Join title and optional description into the caption sent to the platform.
///
/// The result is truncated on a character boundary to [`MAX_CAPTION_CHARS`].
pub fn build_caption(title: &str, description: Option<&str>) -> String {
    let title = title.trim();
    let caption = match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(desc) => format!("{title}\n\n{desc}"),
        None => title.to_string(),
    };
    caption.chars().take(MAX_CAPTION_CHARS).collect()
}
