//! The per-platform publishing capability.
//!
//! Every supported network implements [`PlatformStrategy`]. The pipeline only
//! ever talks to `dyn PlatformStrategy`, obtained from a [`StrategyFactory`]
//! keyed by the client's [`SocialIdentity`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use cadence_core::scheduling::build_caption;
use cadence_core::social::SocialIdentity;
use cadence_core::types::Timestamp;

use crate::client::GraphClient;
use crate::error::PlatformError;
use crate::facebook::FacebookStrategy;
use crate::instagram::InstagramStrategy;

/// Platform credentials of one client account.
#[derive(Clone)]
pub struct Credentials {
    /// Instagram business account id or Facebook page id.
    pub account_id: String,
    /// Long-lived access token.
    pub access_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The publishable metadata of a reel.
#[derive(Debug, Clone)]
pub struct ReelPost {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: Timestamp,
}

impl ReelPost {
    pub fn caption(&self) -> String {
        build_caption(&self.title, self.description.as_deref())
    }
}

/// An uploaded video held in memory.
#[derive(Clone)]
pub struct VideoFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl VideoFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Result of the final publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub success: bool,
    /// Id of the published media object.
    pub media_id: String,
    /// Public URL when the publish response already carries it. When `None`
    /// the caller resolves it through [`PlatformStrategy::fetch_permalink`].
    pub permalink: Option<String>,
}

/// What `schedule_publishing` arranged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The platform holds the reel and publishes it itself.
    NativelyScheduled,
    /// The video is uploaded but publication is up to the local arranger.
    Deferred { due: Timestamp },
    /// The reel went live during the call.
    Published(PublishResult),
}

/// The publishing pipeline of one social network.
///
/// Implementations are stateless apart from their HTTP client and never
/// retry; a failed remote call is returned to the caller as-is.
#[async_trait]
pub trait PlatformStrategy: Send + Sync {
    /// The identity this strategy serves.
    fn identity(&self) -> SocialIdentity;

    /// Whether [`schedule_publishing`](Self::schedule_publishing) always
    /// answers [`ScheduleOutcome::Deferred`]. Such reels are stored as
    /// local-publish jobs from the start.
    fn publishes_locally(&self) -> bool {
        false
    }

    /// Look up the platform account id reachable with `access_token`.
    async fn resolve_account_id(&self, access_token: &str) -> Result<String, PlatformError>;

    /// Begin an upload session. Returns the opaque container id.
    async fn create_container(
        &self,
        creds: &Credentials,
        post: &ReelPost,
    ) -> Result<String, PlatformError>;

    /// Send the video bytes to the container.
    async fn upload_video(
        &self,
        creds: &Credentials,
        container_id: &str,
        video: &VideoFile,
    ) -> Result<(), PlatformError>;

    /// Upload the video and arrange publication at `post.scheduled_date`.
    async fn schedule_publishing(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
        video: &VideoFile,
    ) -> Result<ScheduleOutcome, PlatformError>;

    /// Commit the container and make it public now.
    async fn publish_immediately(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
    ) -> Result<PublishResult, PlatformError>;

    /// Resolve the permanent public URL of a published media object.
    async fn fetch_permalink(
        &self,
        creds: &Credentials,
        media_id: &str,
    ) -> Result<String, PlatformError>;
}

/// Maps a [`SocialIdentity`] to its [`PlatformStrategy`].
#[derive(Clone, Default)]
pub struct StrategyFactory {
    strategies: HashMap<SocialIdentity, Arc<dyn PlatformStrategy>>,
}

impl StrategyFactory {
    /// An empty factory. Every lookup fails until strategies are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The production wiring: Instagram and Facebook over one Graph client.
    pub fn graph(client: GraphClient) -> Self {
        Self::new()
            .register(Arc::new(InstagramStrategy::new(client.clone())))
            .register(Arc::new(FacebookStrategy::new(client)))
    }

    /// Register (or replace) the strategy for `strategy.identity()`.
    pub fn register(mut self, strategy: Arc<dyn PlatformStrategy>) -> Self {
        self.strategies.insert(strategy.identity(), strategy);
        self
    }

    /// Resolve the strategy for `identity`, failing fast when none is wired.
    pub fn for_identity(
        &self,
        identity: SocialIdentity,
    ) -> Result<Arc<dyn PlatformStrategy>, PlatformError> {
        self.strategies
            .get(&identity)
            .cloned()
            .ok_or(PlatformError::Unsupported(identity))
    }
}

impl std::fmt::Debug for StrategyFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyFactory")
            .field("identities", &self.strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}
