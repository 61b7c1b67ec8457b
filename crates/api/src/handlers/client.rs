//! Handlers for the `/client` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cadence_core::error::CoreError;
use cadence_core::pagination::Paginated;
use cadence_core::social::SocialIdentity;
use cadence_core::types::DbId;
use cadence_db::models::client::{ClientFilter, ClientResponse, CreateClient, UpdateClient};
use cadence_db::repositories::ClientRepo;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /client/create`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateClientRequest {
    pub social_identity: SocialIdentity,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 120))]
    pub username: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub access_token: String,
    /// Instagram business account id or Facebook page id. Looked up through
    /// the platform when omitted.
    pub account_id: Option<String>,
}

/// Request body for `PUT /client/{id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub username: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Query parameters for `GET /client`.
#[derive(Debug, Default, Deserialize)]
pub struct ClientListQuery {
    pub search: Option<String>,
    pub social_identity: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/v1/client/create
pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(input): Json<CreateClientRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ClientResponse>>)> {
    input.validate()?;

    let name = input.name.trim();
    let username = input.username.trim();
    let identity = input.social_identity;

    if ClientRepo::name_taken(&state.pool, identity.as_str(), name, username, None).await? {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "A {identity} client named '{name}' (@{username}) already exists"
        ))));
    }

    let account_id = match input.account_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let strategy = state.strategies.for_identity(identity)?;
            strategy.resolve_account_id(input.access_token.trim()).await?
        }
    };

    let client = ClientRepo::create(
        &state.pool,
        &CreateClient {
            social_identity: identity,
            name: name.to_string(),
            username: username.to_string(),
            description: input.description,
            access_token: input.access_token.trim().to_string(),
            account_id,
        },
    )
    .await?;

    tracing::info!(client_id = client.id, social_identity = %identity, "Client created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: client.into(),
        }),
    ))
}

/// GET /api/v1/client
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ClientListQuery>,
) -> AppResult<Json<Paginated<ClientResponse>>> {
    let social_identity = params
        .social_identity
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<SocialIdentity>)
        .transpose()?;
    let filter = ClientFilter {
        search: params.search,
        social_identity,
    };
    let page = PaginationParams {
        page: params.page,
        limit: params.limit,
    }
    .page_request();

    let (clients, total) = ClientRepo::list(&state.pool, &filter, page).await?;
    let data = clients.into_iter().map(ClientResponse::from).collect();
    Ok(Json(Paginated::new(data, page, total)))
}

/// GET /api/v1/client/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    let client = ClientRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: client.into(),
    }))
}

/// PUT /api/v1/client/{id}
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClientRequest>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    input.validate()?;

    let existing = ClientRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id,
        }))?;

    let update = UpdateClient {
        name: input.name.map(|n| n.trim().to_string()),
        username: input.username.map(|u| u.trim().to_string()),
        description: input.description,
    };

    let name = update.name.as_deref().unwrap_or(&existing.name);
    let username = update.username.as_deref().unwrap_or(&existing.username);
    if ClientRepo::name_taken(
        &state.pool,
        &existing.social_identity,
        name,
        username,
        Some(id),
    )
    .await?
    {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Another {} client is already named '{name}' (@{username})",
            existing.social_identity
        ))));
    }

    let client = ClientRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id,
        }))?;
    Ok(Json(DataResponse {
        data: client.into(),
    }))
}

/// DELETE /api/v1/client/{id}
///
/// Refused with 409 while the client still has scheduled reels.
pub async fn delete(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ClientRepo::find_by_id(&state.pool, id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id,
        }));
    }

    if ClientRepo::delete_if_idle(&state.pool, id).await? {
        tracing::info!(client_id = id, "Client deleted");
        return Ok(StatusCode::NO_CONTENT);
    }

    let pending = ClientRepo::pending_reel_count(&state.pool, id).await?;
    Err(AppError::Core(CoreError::Conflict(format!(
        "Client has {pending} scheduled reel(s); wait for them to publish or fail before deleting"
    ))))
}
