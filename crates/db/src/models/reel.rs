//! Reel (scheduled publication) model and DTOs.

use cadence_core::error::CoreError;
use cadence_core::social::{ReelStatus, SocialIdentity};
use cadence_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `reels` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reel {
    pub id: DbId,
    /// `None` once the owning client has been deleted.
    pub client_id: Option<DbId>,
    /// Platform-assigned media container id. Unique.
    pub container_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Timestamp,
    /// `SCHEDULED`, `PUBLISHED` or `FAILED`; see [`Reel::status`].
    pub status: String,
    /// Set when the platform cannot hold the reel itself and the local
    /// arranger must publish it at `scheduled_date`.
    pub needs_local_publish: bool,
    pub claimed_at: Option<Timestamp>,
    pub media_id: Option<String>,
    pub video_url: Option<String>,
    pub failure_reason: Option<String>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reel {
    pub fn status(&self) -> Result<ReelStatus, CoreError> {
        self.status.parse()
    }
}

/// A reel joined with the display fields of its client.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ReelListItem {
    pub id: DbId,
    pub client_id: Option<DbId>,
    pub container_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Timestamp,
    pub status: String,
    pub video_url: Option<String>,
    pub failure_reason: Option<String>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub client_name: Option<String>,
    pub client_username: Option<String>,
    pub social_identity: Option<String>,
}

/// DTO for inserting a freshly created container as a scheduled reel.
#[derive(Debug, Clone)]
pub struct CreateReel {
    pub client_id: DbId,
    pub container_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Timestamp,
    /// Start out as a local-publish job, before the upload has finished.
    pub needs_local_publish: bool,
}

/// Filters for the paginated reel listing.
#[derive(Debug, Clone, Default)]
pub struct ReelFilter {
    /// Substring matched against title and description.
    pub search: Option<String>,
    pub status: Option<ReelStatus>,
    pub social_identity: Option<SocialIdentity>,
}
