//! Integration tests for the JSON error envelope and status mapping.

mod common;

use assert_matches::assert_matches;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Request, StatusCode};
use cadence_api::bootstrap::{ensure_operator, BootstrapAccount};
use cadence_api::error::AppError;
use cadence_core::error::CoreError;
use cadence_core::social::SocialIdentity;
use cadence_meta::PlatformError;
use common::{body_json, build_test_app, get_auth, operator_token, send};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn not_found_uses_error_envelope(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let token = operator_token(&app.router, &pool).await;

    let response = get_auth(&app.router, "/api/v1/reels/12345", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(json["error"].as_str().unwrap().contains("12345"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_json_body_is_rejected(pool: PgPool) {
    let app = build_test_app(pool).router;
    let request = Request::post("/api/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = send(&app, request).await;
    assert!(response.status().is_client_error());
}

#[test]
fn unsupported_platform_is_an_internal_error() {
    let err = AppError::from(PlatformError::Unsupported(SocialIdentity::Facebook));
    assert_matches!(err, AppError::InternalError(_));

    let err = AppError::from(PlatformError::Api {
        status: 400,
        message: "Invalid parameter".into(),
    });
    assert_matches!(err, AppError::Core(CoreError::Upstream(m)) if m.contains("Invalid parameter"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bootstrap_creates_operator_only_once(pool: PgPool) {
    let account = BootstrapAccount {
        email: "Admin@Example.com".into(),
        password: "long-enough-password".into(),
        name: "Admin".into(),
    };

    let created = ensure_operator(&pool, &account, 1).await.unwrap();
    assert_eq!(created.unwrap().email, "admin@example.com");

    let second = ensure_operator(&pool, &account, 1).await.unwrap();
    assert!(second.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bootstrap_rejects_short_password(pool: PgPool) {
    let account = BootstrapAccount {
        email: "admin@example.com".into(),
        password: "short".into(),
        name: "Admin".into(),
    };

    let err = ensure_operator(&pool, &account, 1).await.unwrap_err();
    assert_matches!(err, AppError::Core(CoreError::Validation(_)));
}
