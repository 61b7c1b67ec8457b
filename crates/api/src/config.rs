use std::time::Duration;

use cadence_meta::GraphConfig;
use cadence_pipeline::ArrangerConfig;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the secrets have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`). Reel uploads are
    /// forwarded to the platform inside the request.
    pub request_timeout_secs: u64,
    /// Graceful shutdown timeout in seconds for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Largest accepted request body in megabytes (default: `200`).
    pub max_upload_mb: usize,
    /// Argon2 iteration count for new password hashes (default: `3`).
    pub password_hash_cost: u32,
    /// Mark the refresh cookie `Secure; SameSite=None` (default: `true`).
    pub cookie_secure: bool,
    /// Shared secret for the Meta webhook handshake.
    pub meta_verify_token: String,
    /// JWT token configuration (secrets, expiry durations).
    pub jwt: JwtConfig,
    /// Graph API endpoints and timeout.
    pub graph: GraphConfig,
    /// Delayed-publish arranger tuning.
    pub arranger: ArrangerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                        |
    /// |-----------------------------|--------------------------------|
    /// | `HOST`                      | `0.0.0.0`                      |
    /// | `PORT`                      | `3000`                         |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`      | `60`                           |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                           |
    /// | `MAX_UPLOAD_MB`             | `200`                          |
    /// | `PASSWORD_HASH_COST`        | `3`                            |
    /// | `COOKIE_SECURE`             | `true`                         |
    /// | `META_VERIFY_TOKEN`         | **required**                   |
    /// | `META_GRAPH_URL`            | `https://graph.facebook.com`   |
    /// | `META_UPLOAD_URL`           | `https://rupload.facebook.com` |
    /// | `META_API_VERSION`          | `v21.0`                        |
    /// | `META_REQUEST_TIMEOUT_SECS` | `300`                          |
    /// | `ARRANGER_POLL_SECS`        | `30`                           |
    /// | `ARRANGER_CLAIM_LEASE_SECS` | `600`                          |
    ///
    /// JWT variables are documented on [`JwtConfig::from_env`].
    ///
    /// # Panics
    ///
    /// Panics on unparsable values or a missing `META_VERIFY_TOKEN`.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = env_or("PORT", "3000")
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", "60")
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", "30")
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_upload_mb: usize = env_or("MAX_UPLOAD_MB", "200")
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid usize");

        let password_hash_cost: u32 = env_or("PASSWORD_HASH_COST", "3")
            .parse()
            .expect("PASSWORD_HASH_COST must be a valid u32");

        let cookie_secure: bool = env_or("COOKIE_SECURE", "true")
            .parse()
            .expect("COOKIE_SECURE must be true or false");

        let meta_verify_token = std::env::var("META_VERIFY_TOKEN")
            .expect("META_VERIFY_TOKEN must be set in the environment");
        assert!(
            !meta_verify_token.is_empty(),
            "META_VERIFY_TOKEN must not be empty"
        );

        let defaults = GraphConfig::default();
        let graph_timeout_secs: u64 = env_or("META_REQUEST_TIMEOUT_SECS", "300")
            .parse()
            .expect("META_REQUEST_TIMEOUT_SECS must be a valid u64");
        let graph = GraphConfig {
            graph_url: std::env::var("META_GRAPH_URL").unwrap_or(defaults.graph_url),
            upload_url: std::env::var("META_UPLOAD_URL").unwrap_or(defaults.upload_url),
            api_version: std::env::var("META_API_VERSION").unwrap_or(defaults.api_version),
            timeout: Duration::from_secs(graph_timeout_secs),
        };

        let poll_secs: u64 = env_or("ARRANGER_POLL_SECS", "30")
            .parse()
            .expect("ARRANGER_POLL_SECS must be a valid u64");
        let lease_secs: i64 = env_or("ARRANGER_CLAIM_LEASE_SECS", "600")
            .parse()
            .expect("ARRANGER_CLAIM_LEASE_SECS must be a valid i64");
        let arranger = ArrangerConfig {
            poll_interval: Duration::from_secs(poll_secs),
            claim_lease: chrono::Duration::seconds(lease_secs),
            ..ArrangerConfig::default()
        };

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            max_upload_mb,
            password_hash_cost,
            cookie_secure,
            meta_verify_token,
            jwt,
            graph,
            arranger,
        }
    }

    /// Maximum request body size in bytes.
    pub fn body_limit_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
