//! Shared fixtures for HTTP integration tests: a test configuration, an
//! in-memory platform strategy, the full router and request helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use cadence_api::auth::jwt::JwtConfig;
use cadence_api::auth::password::hash_password;
use cadence_api::config::ServerConfig;
use cadence_api::router::build_app_router;
use cadence_api::state::AppState;
use cadence_core::scheduling::facebook_supports_native_schedule;
use cadence_core::social::SocialIdentity;
use cadence_core::types::DbId;
use cadence_db::models::client::CreateClient;
use cadence_db::models::user::{CreateUser, User};
use cadence_db::repositories::{ClientRepo, UserRepo};
use cadence_meta::{
    Credentials, GraphConfig, PlatformError, PlatformStrategy, PublishResult, ReelPost,
    ScheduleOutcome, StrategyFactory, VideoFile,
};
use cadence_pipeline::{Arranger, ArrangerConfig, ReelScheduler, WebhookReconciler};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

pub const VERIFY_TOKEN: &str = "test-verify-token";
pub const PASSWORD: &str = "correct-horse-battery";
pub const RESOLVED_ACCOUNT_ID: &str = "17841400000000000";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults.
///
/// Cookies are not marked `Secure` so they can be replayed in plain requests.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        max_upload_mb: 10,
        password_hash_cost: 1,
        cookie_secure: false,
        meta_verify_token: VERIFY_TOKEN.to_string(),
        jwt: JwtConfig {
            access_secret: "test-access-secret-that-is-long-enough".to_string(),
            refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        graph: GraphConfig::default(),
        arranger: ArrangerConfig::default(),
    }
}

// ---------------------------------------------------------------------------
// FakeStrategy
// ---------------------------------------------------------------------------

/// In-memory strategy standing in for the Graph API.
pub struct FakeStrategy {
    identity: SocialIdentity,
    next_container: AtomicUsize,
    /// When set, every container gets this id.
    pub fixed_container: Option<String>,
    pub fail_create: bool,
    pub resolve_calls: AtomicUsize,
}

impl FakeStrategy {
    pub fn new(identity: SocialIdentity) -> Self {
        Self {
            identity,
            next_container: AtomicUsize::new(1),
            fixed_container: None,
            fail_create: false,
            resolve_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PlatformStrategy for FakeStrategy {
    fn identity(&self) -> SocialIdentity {
        self.identity
    }

    fn publishes_locally(&self) -> bool {
        self.identity == SocialIdentity::Instagram
    }

    async fn resolve_account_id(&self, access_token: &str) -> Result<String, PlatformError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if access_token == "expired-token" {
            return Err(PlatformError::Api {
                status: 400,
                message: "Error validating access token: Session has expired".into(),
            });
        }
        Ok(RESOLVED_ACCOUNT_ID.to_string())
    }

    async fn create_container(
        &self,
        _creds: &Credentials,
        _post: &ReelPost,
    ) -> Result<String, PlatformError> {
        if self.fail_create {
            return Err(PlatformError::Api {
                status: 400,
                message: "Invalid OAuth access token".into(),
            });
        }
        Ok(match &self.fixed_container {
            Some(id) => id.clone(),
            None => {
                let n = self.next_container.fetch_add(1, Ordering::SeqCst);
                format!("{}-container-{n}", self.identity.as_str().to_lowercase())
            }
        })
    }

    async fn upload_video(
        &self,
        _creds: &Credentials,
        _container_id: &str,
        _video: &VideoFile,
    ) -> Result<(), PlatformError> {
        Ok(())
    }

    async fn schedule_publishing(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
        video: &VideoFile,
    ) -> Result<ScheduleOutcome, PlatformError> {
        self.upload_video(creds, container_id, video).await?;
        match self.identity {
            SocialIdentity::Instagram => Ok(ScheduleOutcome::Deferred {
                due: post.scheduled_date,
            }),
            SocialIdentity::Facebook => {
                if facebook_supports_native_schedule(post.scheduled_date, Utc::now()) {
                    Ok(ScheduleOutcome::NativelyScheduled)
                } else {
                    let result = self.publish_immediately(creds, container_id, post).await?;
                    Ok(ScheduleOutcome::Published(result))
                }
            }
        }
    }

    async fn publish_immediately(
        &self,
        _creds: &Credentials,
        container_id: &str,
        _post: &ReelPost,
    ) -> Result<PublishResult, PlatformError> {
        Ok(PublishResult {
            success: true,
            media_id: format!("media-{container_id}"),
            permalink: None,
        })
    }

    async fn fetch_permalink(
        &self,
        _creds: &Credentials,
        media_id: &str,
    ) -> Result<String, PlatformError> {
        Ok(format!("https://www.instagram.com/reel/{media_id}/"))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// The router plus the pieces tests poke at directly.
pub struct TestApp {
    pub router: Router,
    pub instagram: Arc<FakeStrategy>,
    pub facebook: Arc<FakeStrategy>,
    pub arranger: Arranger,
}

/// Build the full application router over fake Instagram and Facebook
/// strategies. The arranger is not running; tests call `sweep` themselves.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(
        pool,
        FakeStrategy::new(SocialIdentity::Instagram),
        FakeStrategy::new(SocialIdentity::Facebook),
    )
}

pub fn build_test_app_with(
    pool: PgPool,
    instagram: FakeStrategy,
    facebook: FakeStrategy,
) -> TestApp {
    let config = test_config();
    let instagram = Arc::new(instagram);
    let facebook = Arc::new(facebook);
    let strategies = Arc::new(
        StrategyFactory::new()
            .register(instagram.clone())
            .register(facebook.clone()),
    );
    let arranger = Arranger::new(pool.clone(), strategies.clone(), config.arranger.clone());

    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        strategies: strategies.clone(),
        scheduler: ReelScheduler::new(pool.clone(), strategies, arranger.handle()),
        reconciler: WebhookReconciler::new(pool),
    };

    TestApp {
        router: build_app_router(state, &config),
        instagram,
        facebook,
        arranger,
    }
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// Insert an active operator with password [`PASSWORD`].
pub async fn create_user(pool: &PgPool, email: &str) -> User {
    let password_hash = hash_password(PASSWORD, 1).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Operator".to_string(),
            password_hash,
        },
    )
    .await
    .expect("user creation should succeed")
}

pub async fn seed_client(pool: &PgPool, identity: SocialIdentity, name: &str) -> DbId {
    ClientRepo::create(
        pool,
        &CreateClient {
            social_identity: identity,
            name: name.to_string(),
            username: name.to_lowercase().replace(' ', ""),
            description: Some("Seeded for tests".into()),
            access_token: "EAAG-long-lived".into(),
            account_id: RESOLVED_ACCOUNT_ID.into(),
        },
    )
    .await
    .expect("client creation should succeed")
    .id
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn delete_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::delete(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a JSON body with optional Bearer token and refresh cookie.
pub async fn json_request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Value,
    token: Option<&str>,
    cookie: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, format!("jwt={cookie}"));
    }
    send(app, builder.body(Body::from(body.to_string())).unwrap()).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    json_request(app, Method::POST, uri, body, None, None).await
}

pub async fn post_json_auth(app: &Router, uri: &str, body: Value, token: &str) -> Response<Body> {
    json_request(app, Method::POST, uri, body, Some(token), None).await
}

/// POST with only a refresh cookie (refresh / logout).
pub async fn post_with_cookie(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::post(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, format!("jwt={cookie}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Value of the `jwt` cookie set by a response, if any (empty when cleared).
pub fn set_cookie_value(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("jwt="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

/// Log in through the API. Returns `(access_token, refresh_cookie)`.
pub async fn login(app: &Router, email: &str) -> (String, String) {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let cookie = set_cookie_value(&response).expect("login should set the refresh cookie");
    let json = body_json(response).await;
    let token = json["accessToken"].as_str().unwrap().to_string();
    (token, cookie)
}

/// Create a user and log in. Returns the access token.
pub async fn operator_token(app: &Router, pool: &PgPool) -> String {
    create_user(pool, "ops@example.com").await;
    login(app, "ops@example.com").await.0
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

const BOUNDARY: &str = "cadence-test-boundary";

/// Build a `multipart/form-data` request for `POST /reels/schedule-reel`.
pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    video: Option<&[u8]>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = video {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"reel.mp4\"\r\nContent-Type: video/mp4\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Poll until `check` passes or a second elapses. For work done on spawned tasks.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..50 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}
