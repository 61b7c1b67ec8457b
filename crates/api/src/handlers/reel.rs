//! Handlers for the `/reels` resource.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::error::CoreError;
use cadence_core::pagination::Paginated;
use cadence_core::scheduling::validate_scheduled_date;
use cadence_core::social::{ReelStatus, SocialIdentity};
use cadence_core::types::{DbId, Timestamp};
use cadence_db::models::reel::{Reel, ReelFilter, ReelListItem};
use cadence_db::repositories::ReelRepo;
use cadence_meta::VideoFile;
use cadence_pipeline::{ScheduleReelInput, ScheduledReel};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Text fields of the `POST /reels/schedule-reel` form, once parsed.
#[derive(Debug, Validate)]
struct ScheduleReelForm {
    client_id: DbId,
    #[validate(length(min = 1, max = 200))]
    title: String,
    #[validate(length(max = 2000))]
    description: Option<String>,
    social_identity: SocialIdentity,
    scheduled_date: Timestamp,
}

/// Query parameters for `GET /reels`.
#[derive(Debug, Default, Deserialize)]
pub struct ReelListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub social_identity: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/v1/reels/schedule-reel
///
/// Accepts a multipart form with a required `video` file and the fields
/// `client_id`, `title`, `description` (optional), `scheduled_date`
/// (RFC 3339) and `social_identity`.
pub async fn schedule(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<ScheduledReel>>)> {
    let mut video: Option<VideoFile> = None;
    let mut client_id: Option<String> = None;
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut scheduled_date: Option<String> = None;
    let mut social_identity: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "video" {
            let file_name = field.file_name().unwrap_or("reel.mp4").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            video = Some(VideoFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let slot = match name.as_str() {
            "client_id" => &mut client_id,
            "title" => &mut title,
            "description" => &mut description,
            "scheduled_date" => &mut scheduled_date,
            "social_identity" => &mut social_identity,
            _ => continue, // ignore unknown fields
        };
        let text = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        *slot = Some(text);
    }

    let video = video
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required 'video' file".into()))?;

    let form = ScheduleReelForm {
        client_id: required(client_id, "client_id")?
            .trim()
            .parse()
            .map_err(|_| invalid("client_id must be an integer"))?,
        title: required(title, "title")?.trim().to_string(),
        description: description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        social_identity: required(social_identity, "social_identity")?.parse()?,
        scheduled_date: parse_timestamp(&required(scheduled_date, "scheduled_date")?)?,
    };
    form.validate()?;
    validate_scheduled_date(form.scheduled_date, Utc::now())?;

    tracing::info!(
        user_id = user.user_id,
        client_id = form.client_id,
        social_identity = %form.social_identity,
        video_bytes = video.len(),
        "Scheduling reel"
    );

    let scheduled = state
        .scheduler
        .schedule_reel(
            ScheduleReelInput {
                client_id: form.client_id,
                title: form.title,
                description: form.description,
                social_identity: form.social_identity,
                scheduled_date: form.scheduled_date,
            },
            video,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: scheduled })))
}

/// GET /api/v1/reels
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ReelListQuery>,
) -> AppResult<Json<Paginated<ReelListItem>>> {
    let filter = ReelFilter {
        search: params.search,
        status: parse_optional::<ReelStatus>(params.status.as_deref())?,
        social_identity: parse_optional::<SocialIdentity>(params.social_identity.as_deref())?,
    };
    let page = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .page_request();

    let (reels, total) = ReelRepo::list(&state.pool, &filter, page).await?;
    Ok(Json(Paginated::new(reels, page, total)))
}

/// GET /api/v1/reels/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Reel>>> {
    let reel = ReelRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Reel", id }))?;
    Ok(Json(DataResponse { data: reel }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| invalid(&format!("Missing required field '{field}'")))
}

fn invalid(msg: &str) -> AppError {
    AppError::Core(CoreError::Validation(msg.to_string()))
}

fn parse_timestamp(raw: &str) -> AppResult<Timestamp> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| invalid("scheduled_date must be an RFC 3339 timestamp"))
}

/// Parse an optional filter value; blank strings mean "no filter".
fn parse_optional<T>(raw: Option<&str>) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = CoreError>,
{
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<T>)
        .transpose()
        .map_err(AppError::from)
}
