//! Shared fixtures for pipeline integration tests: a recording in-memory
//! platform strategy and client seeding helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cadence_core::scheduling::facebook_supports_native_schedule;
use cadence_core::social::SocialIdentity;
use cadence_core::types::DbId;
use cadence_db::models::client::CreateClient;
use cadence_db::repositories::ClientRepo;
use cadence_meta::{
    Credentials, PlatformError, PlatformStrategy, PublishResult, ReelPost, ScheduleOutcome,
    StrategyFactory, VideoFile,
};
use cadence_pipeline::{Arranger, ArrangerConfig, ReelScheduler, WebhookReconciler};
use chrono::Utc;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// FakeStrategy
// ---------------------------------------------------------------------------

/// Calls observed by [`FakeStrategy`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateContainer,
    Upload(String),
    Schedule(String),
    Publish(String),
    Permalink(String),
}

/// In-memory strategy that behaves like the real platform for one identity.
pub struct FakeStrategy {
    identity: SocialIdentity,
    calls: Mutex<Vec<Call>>,
    next_container: AtomicUsize,
    /// When set, every container gets this id.
    pub fixed_container: Option<String>,
    pub fail_create: bool,
    pub fail_schedule: bool,
    pub fail_publish: bool,
    /// Publish calls succeed at the transport level but report `success: false`.
    pub reject_publish: bool,
    /// The upload never finishes, like a process dying mid-transfer.
    pub stall_upload: bool,
    /// Number of publish attempts answered with `NotReady`.
    pub not_ready_attempts: AtomicUsize,
}

impl FakeStrategy {
    pub fn new(identity: SocialIdentity) -> Self {
        Self {
            identity,
            calls: Mutex::new(Vec::new()),
            next_container: AtomicUsize::new(1),
            fixed_container: None,
            fail_create: false,
            fail_schedule: false,
            fail_publish: false,
            reject_publish: false,
            stall_upload: false,
            not_ready_attempts: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Publish(_)))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn media_id(container_id: &str) -> String {
        format!("media-{container_id}")
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

    async fn resolve_account_id(&self, _access_token: &str) -> Result<String, PlatformError> {
        Ok("17841400000000000".to_string())
    }

    async fn create_container(
        &self,
        _creds: &Credentials,
        _post: &ReelPost,
    ) -> Result<String, PlatformError> {
        self.record(Call::CreateContainer);
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
        container_id: &str,
        _video: &VideoFile,
    ) -> Result<(), PlatformError> {
        self.record(Call::Upload(container_id.to_string()));
        if self.stall_upload {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn schedule_publishing(
        &self,
        creds: &Credentials,
        container_id: &str,
        post: &ReelPost,
        video: &VideoFile,
    ) -> Result<ScheduleOutcome, PlatformError> {
        self.record(Call::Schedule(container_id.to_string()));
        if self.fail_schedule {
            return Err(PlatformError::Api {
                status: 400,
                message: "The video file is corrupted".into(),
            });
        }
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
        self.record(Call::Publish(container_id.to_string()));
        let pending = self.not_ready_attempts.load(Ordering::SeqCst);
        if pending > 0 {
            self.not_ready_attempts.store(pending - 1, Ordering::SeqCst);
            return Err(PlatformError::NotReady {
                container_id: container_id.to_string(),
                status: "IN_PROGRESS".into(),
            });
        }
        if self.fail_publish {
            return Err(PlatformError::Api {
                status: 400,
                message: "Media upload has failed with error code 2207026".into(),
            });
        }
        Ok(PublishResult {
            success: !self.reject_publish,
            media_id: Self::media_id(container_id),
            permalink: None,
        })
    }

    async fn fetch_permalink(
        &self,
        _creds: &Credentials,
        media_id: &str,
    ) -> Result<String, PlatformError> {
        self.record(Call::Permalink(media_id.to_string()));
        Ok(format!("https://www.instagram.com/reel/{media_id}/"))
    }
}

// ---------------------------------------------------------------------------
// Wiring helpers
// ---------------------------------------------------------------------------

/// Scheduler, arranger and reconciler over one fake strategy.
pub struct Harness {
    pub strategy: Arc<FakeStrategy>,
    pub scheduler: ReelScheduler,
    pub arranger: Arranger,
    pub reconciler: WebhookReconciler,
}

pub fn harness(pool: &PgPool, strategy: FakeStrategy) -> Harness {
    let strategy = Arc::new(strategy);
    let factory = Arc::new(StrategyFactory::new().register(strategy.clone()));
    let arranger = Arranger::new(pool.clone(), factory.clone(), ArrangerConfig::default());
    let scheduler = ReelScheduler::new(pool.clone(), factory, arranger.handle());
    Harness {
        strategy,
        scheduler,
        arranger,
        reconciler: WebhookReconciler::new(pool.clone()),
    }
}

pub async fn seed_client(pool: &PgPool, identity: SocialIdentity) -> DbId {
    ClientRepo::create(
        pool,
        &CreateClient {
            social_identity: identity,
            name: "Corner Bakery".into(),
            username: "cornerbakery".into(),
            description: Some("Neighbourhood bakery".into()),
            access_token: "EAAG-long-lived".into(),
            account_id: "17841400000000000".into(),
        },
    )
    .await
    .unwrap()
    .id
}

pub fn video() -> VideoFile {
    VideoFile {
        file_name: "reel.mp4".into(),
        content_type: Some("video/mp4".into()),
        bytes: vec![0u8; 1024],
    }
}

pub async fn reel_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reels")
        .fetch_one(pool)
        .await
        .unwrap()
}
