//! Handlers for the `/auth` resource (login, refresh, logout, me).
//!
//! Each user holds a *set* of refresh tokens, one per signed-in device. A
//! token is single-use: refreshing swaps it for a new one. Presenting a
//! token that verifies but is no longer in any set means it was already
//! rotated away, so it has leaked; the owner's whole set is revoked.
//! Writes touch only the presented and the new token, so devices refreshing
//! at the same time do not disturb each other.

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cadence_core::error::CoreError;
use cadence_core::types::DbId;
use cadence_db::models::refresh_token::NewRefreshToken;
use cadence_db::models::user::{User, UserResponse};
use cadence_db::repositories::{RefreshTokenRepo, UserRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::cookie::{clear_cookie_header, read_refresh_cookie, refresh_cookie_header};
use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, hash_refresh_token, validate_refresh_token,
};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Successful login response. The refresh token is only sent as a cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserResponse,
}

/// Successful refresh response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

type CookieHeader = [(HeaderName, HeaderValue); 1];

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns an access token and sets the
/// refresh cookie.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<(CookieHeader, Json<LoginResponse>)> {
    input.validate()?;

    // 1. Find user by email.
    let user = UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .ok_or_else(|| AppError::NotFound("No account exists for this email".into()))?;

    // 2. Verify password.
    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    // 3. Check if the account is active.
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    // 4. Issue tokens; the cookie this browser already held is dropped.
    let access_token = issue_access_token(&state, &user)?;
    let issued = issue_refresh_token(&state, user.id)?;
    let presented = read_refresh_cookie(&headers).map(|t| hash_refresh_token(&t));
    let cleared =
        RefreshTokenRepo::issue_for_login(&state.pool, user.id, presented.as_deref(), &issued.row)
            .await?;
    if cleared {
        tracing::warn!(
            user_id = user.id,
            "Login presented an unknown refresh token, revoking all sessions"
        );
    }
    let cookie = issued.cookie;

    UserRepo::record_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/refresh
///
/// Exchange the refresh cookie for a new access token and a new cookie.
/// Any failure after the cookie was read also clears the cookie.
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = read_refresh_cookie(&headers) else {
        return AppError::Core(CoreError::Unauthorized("Missing refresh token".into()))
            .into_response();
    };

    match rotate_session(&state, &token).await {
        Ok(response) => response.into_response(),
        Err(err) => {
            let mut response = err.into_response();
            response.headers_mut().insert(
                SET_COOKIE,
                clear_cookie_header(state.config.cookie_secure),
            );
            response
        }
    }
}

/// POST /api/v1/auth/logout
///
/// Remove the presented refresh token from its owner's set and clear the
/// cookie. Always returns 204 No Content.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, CookieHeader)> {
    if let Some(token) = read_refresh_cookie(&headers) {
        let hash = hash_refresh_token(&token);
        if let Some(user_id) = RefreshTokenRepo::delete_by_hash(&state.pool, &hash).await? {
            tracing::info!(user_id, "User logged out");
        }
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_cookie_header(state.config.cookie_secure))],
    ))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Refresh-token rotation behind [`refresh`].
async fn rotate_session(
    state: &AppState,
    token: &str,
) -> AppResult<(CookieHeader, Json<RefreshResponse>)> {
    let hash = hash_refresh_token(token);
    let claims = validate_refresh_token(token, &state.config.jwt);

    let Some(stored) = RefreshTokenRepo::find_by_hash(&state.pool, &hash).await? else {
        // A token that verifies but is in nobody's set was already rotated away.
        if let Ok(claims) = claims {
            let revoked = RefreshTokenRepo::delete_all_for_user(&state.pool, claims.sub).await?;
            tracing::warn!(
                user_id = claims.sub,
                revoked,
                "Refresh token reuse detected, all sessions revoked"
            );
        }
        return Err(forbidden());
    };

    let valid = matches!(&claims, Ok(c) if c.sub == stored.user_id)
        && stored.expires_at > Utc::now();
    if !valid {
        RefreshTokenRepo::delete_by_hash(&state.pool, &hash).await?;
        return Err(forbidden());
    }

    let user = match UserRepo::find_by_id(&state.pool, stored.user_id).await? {
        Some(user) if user.is_active => user,
        _ => {
            RefreshTokenRepo::delete_by_hash(&state.pool, &hash).await?;
            return Err(forbidden());
        }
    };

    let access_token = issue_access_token(state, &user)?;
    let issued = issue_refresh_token(state, user.id)?;
    if !RefreshTokenRepo::rotate(&state.pool, user.id, &hash, &issued.row).await? {
        // Another request consumed this token between the lookup and now:
        // the same token was presented twice.
        let revoked = RefreshTokenRepo::delete_all_for_user(&state.pool, user.id).await?;
        tracing::warn!(
            user_id = user.id,
            revoked,
            "Refresh token used concurrently, all sessions revoked"
        );
        return Err(forbidden());
    }
    tracing::debug!(user_id = user.id, "Refresh token rotated");

    Ok(([(SET_COOKIE, issued.cookie)], Json(RefreshResponse { access_token })))
}

fn issue_access_token(state: &AppState, user: &User) -> AppResult<String> {
    generate_access_token(user.id, &user.email, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}

/// A new refresh token: the row to store and the matching `Set-Cookie` value.
struct IssuedCookie {
    row: NewRefreshToken,
    cookie: HeaderValue,
}

fn issue_refresh_token(state: &AppState, user_id: DbId) -> AppResult<IssuedCookie> {
    let issued = generate_refresh_token(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(IssuedCookie {
        cookie: refresh_cookie_header(
            &issued.token,
            state.config.jwt.refresh_max_age_secs(),
            state.config.cookie_secure,
        ),
        row: NewRefreshToken {
            token_hash: issued.hash,
            expires_at: issued.expires_at,
        },
    })
}

fn forbidden() -> AppError {
    AppError::Core(CoreError::Forbidden(
        "Invalid or expired refresh token".into(),
    ))
}
