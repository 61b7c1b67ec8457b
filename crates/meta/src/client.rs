//! HTTP client for the Meta Graph API.
//!
//! Wraps the two hosts the publishing flow talks to: the Graph API itself
//! (container creation, publish, permalink lookup) and the resumable upload
//! host that receives the video bytes.

use std::time::Duration;

use serde_json::Value;

use crate::error::PlatformError;

/// Default Graph API host.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Default resumable upload host.
pub const DEFAULT_UPLOAD_URL: &str = "https://rupload.facebook.com";

/// Default Graph API version.
pub const DEFAULT_API_VERSION: &str = "v21.0";

/// Default per-request timeout. Uploads of large reels dominate this.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for [`GraphClient`].
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub graph_url: String,
    pub upload_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Shared Graph API client. Cheap to clone (the inner `reqwest::Client` is
/// reference counted).
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    config: GraphConfig,
}

impl GraphClient {
    /// Build a client with its own connection pool.
    pub fn new(config: GraphConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GraphConfig) -> Self {
        Self { client, config }
    }

    /// Versioned Graph API URL for `path` (e.g. `"{ig-user-id}/media"`).
    pub fn graph_endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.graph_url.trim_end_matches('/'),
            self.config.api_version,
            path.trim_start_matches('/')
        )
    }

    /// Upload-host URL for a container, e.g.
    /// `https://rupload.facebook.com/ig-api-upload/v21.0/{container_id}`.
    pub fn upload_endpoint(&self, service: &str, container_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.config.upload_url.trim_end_matches('/'),
            service,
            self.config.api_version,
            container_id
        )
    }

    /// `GET` a Graph API path with query parameters.
    pub async fn get(
        &self,
        path: &str,
        access_token: &str,
        params: &[(&str, String)],
    ) -> Result<Value, PlatformError> {
        let response = self
            .client
            .get(self.graph_endpoint(path))
            .query(params)
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// `POST` to a Graph API path. Parameters travel in the query string,
    /// which the Graph API accepts for every publishing endpoint.
    pub async fn post(
        &self,
        path: &str,
        access_token: &str,
        params: &[(&str, String)],
    ) -> Result<Value, PlatformError> {
        let response = self
            .client
            .post(self.graph_endpoint(path))
            .query(params)
            .query(&[("access_token", access_token)])
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Send the whole video to a resumable-upload URL in one chunk.
    ///
    /// The upload protocol requires `offset` and `file_size` headers and an
    /// `OAuth` authorization scheme instead of the `access_token` parameter.
    pub async fn upload_binary(
        &self,
        url: &str,
        access_token: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, PlatformError> {
        let file_size = bytes.len();
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, format!("OAuth {access_token}"))
            .header("offset", "0")
            .header("file_size", file_size.to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;

        tracing::debug!(url, file_size, status = %response.status(), "Upload request finished");
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Map non-2xx statuses to [`PlatformError::Api`] and parse JSON bodies.
    async fn parse_response(response: reqwest::Response) -> Result<Value, PlatformError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: graph_error_message(&body),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|_| PlatformError::Api {
            status: status.as_u16(),
            message: format!("unexpected non-JSON response: {}", truncate(&body, 200)),
        })
    }
}

/// Extract `error.message` (plus `error_user_msg` when present) from a Graph
/// API error body, falling back to the raw body text.
pub fn graph_error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error"));

    match error {
        Some(err) => {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown Graph API error");
            match err.get("error_user_msg").and_then(Value::as_str) {
                Some(user_msg) if user_msg != message => format!("{message} ({user_msg})"),
                _ => message.to_string(),
            }
        }
        None if body.trim().is_empty() => "<empty body>".to_string(),
        None => truncate(body, 500).to_string(),
    }
}

/// Read a required identifier from a response.
///
/// Graph ids arrive as strings but some endpoints return numbers; both are
/// accepted.
pub fn require_id(value: &Value, field: &'static str) -> Result<String, PlatformError> {
    match value.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(PlatformError::MissingField(field)),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
