use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cadence_core::error::CoreError;
use cadence_meta::PlatformError;
use cadence_pipeline::PipelineError;
use serde::Serialize;

/// Error type returned by every handler.
///
/// Rendered as `{"error": "...", "code": "..."}` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input that never reached domain validation (multipart, body).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A lookup by something other than an id found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Logged in full; the client only sees a generic message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<PlatformError> for AppError {
    fn from(err: PlatformError) -> Self {
        match &err {
            // A missing strategy is a wiring mistake, not the caller's fault.
            PlatformError::Unsupported(_) => AppError::InternalError(err.to_string()),
            _ => AppError::Core(CoreError::Upstream(err.to_string())),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Core(core) => AppError::Core(core),
            PipelineError::Database(db) => AppError::Database(db),
            PipelineError::Platform(platform) => platform.into(),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        AppError::Core(CoreError::Validation(format!(
            "Invalid fields: {}",
            fields.join(", ")
        )))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    /// Status, machine-readable code and client-facing message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            // The Graph API message is the only useful diagnostic the
            // operator gets, so it is passed through.
            AppError::Core(CoreError::Upstream(msg)) => {
                tracing::warn!(error = %msg, "Platform call failed");
                (StatusCode::BAD_REQUEST, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Core(CoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Core(CoreError::Unauthorized(msg)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
            }
            AppError::Core(CoreError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Core(CoreError::Internal(msg)) | AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.parts();
        (status, axum::Json(ErrorBody { error, code })).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Map a sqlx error onto the response triple.
///
/// Unique violations (`23505`) on our `uq_*` constraints become 409 so a
/// race past the pre-insert checks still reads as a duplicate. Everything
/// else is a logged 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    if let sqlx::Error::RowNotFound = err {
        return (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        );
    }

    let unique_violation = match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            db_err.constraint().filter(|c| c.starts_with("uq_"))
        }
        _ => None,
    };

    match unique_violation {
        Some(constraint) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            conflict_message(constraint),
        ),
        None => {
            tracing::error!(error = %err, "Database error");
            internal()
        }
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "uq_clients_identity_name_username" => {
            "A client with this name and username already exists on this platform".to_string()
        }
        "uq_reels_container_id" => "A reel already exists for this media container".to_string(),
        "uq_users_email" => "A user with this email already exists".to_string(),
        other => format!("Duplicate value violates unique constraint: {other}"),
    }
}
