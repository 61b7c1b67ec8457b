//! Handlers for the `/webhook-events` audit resource.
//!
//! Every webhook delivery is stored before it is applied. Deliveries that
//! failed or never finished form the dead-letter set.

use axum::extract::{Path, Query, State};
use axum::Json;
use cadence_core::error::CoreError;
use cadence_core::pagination::Paginated;
use cadence_core::types::DbId;
use cadence_db::models::webhook_event::WebhookEvent;
use cadence_db::repositories::WebhookEventRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /webhook-events`.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookEventQuery {
    #[serde(default)]
    pub failed_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/v1/webhook-events
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<WebhookEventQuery>,
) -> AppResult<Json<Paginated<WebhookEvent>>> {
    let page = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .page_request();
    let (events, total) = WebhookEventRepo::list(&state.pool, params.failed_only, page).await?;
    Ok(Json(Paginated::new(events, page, total)))
}

/// GET /api/v1/webhook-events/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<WebhookEvent>>> {
    let event = WebhookEventRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "WebhookEvent",
            id,
        }))?;
    Ok(Json(DataResponse { data: event }))
}
