use cadence_core::social::SocialIdentity;

/// Errors from the Graph API layer and the platform strategies.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The Graph API answered with a non-2xx status. `message` is the
    /// platform's own `error.message` when present, else the raw body.
    #[error("Graph API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx response did not carry a field the protocol requires.
    #[error("Graph API response is missing `{0}`")]
    MissingField(&'static str),

    /// The container is still processing the upload.
    #[error("Container {container_id} is not ready for publishing (status: {status})")]
    NotReady { container_id: String, status: String },

    /// No strategy is registered for this identity.
    #[error("No publishing strategy registered for {0}")]
    Unsupported(SocialIdentity),
}

impl PlatformError {
    /// Transient states the arranger should retry on its next sweep.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PlatformError::NotReady { .. })
    }
}
