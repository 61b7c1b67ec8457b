//! Publishing orchestrator.
//!
//! [`ReelScheduler::schedule_reel`] runs the strictly ordered workflow:
//! load client, create the remote container, persist the reel, then hand
//! publication to the platform or the local arranger. A reel row only ever
//! exists for a container the platform already created.

use std::sync::Arc;

use cadence_core::error::CoreError;
use cadence_core::social::{ReelStatus, SocialIdentity};
use cadence_core::types::{DbId, Timestamp};
use cadence_db::models::client::Client;
use cadence_db::models::reel::{CreateReel, Reel};
use cadence_db::repositories::{ClientRepo, ReelRepo};
use cadence_meta::{ReelPost, ScheduleOutcome, StrategyFactory, VideoFile};
use serde::Serialize;
use sqlx::PgPool;

use crate::arranger::ArrangerHandle;
use crate::error::PipelineError;
use crate::publish::{complete_publication, credentials_for};

/// Validated scheduling request.
#[derive(Debug, Clone)]
pub struct ScheduleReelInput {
    pub client_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub social_identity: SocialIdentity,
    pub scheduled_date: Timestamp,
}

/// What the caller gets back once scheduling succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledReel {
    pub reel_id: DbId,
    pub container_id: String,
    pub scheduled_date: Timestamp,
    pub status: ReelStatus,
    /// Set when the reel went live during the request.
    pub video_url: Option<String>,
}

impl ScheduledReel {
    fn from_reel(reel: &Reel, status: ReelStatus) -> Self {
        Self {
            reel_id: reel.id,
            container_id: reel.container_id.clone(),
            scheduled_date: reel.scheduled_date,
            status,
            video_url: reel.video_url.clone(),
        }
    }
}

/// Runs the scheduling workflow. Cheap to clone.
#[derive(Clone)]
pub struct ReelScheduler {
    pool: PgPool,
    strategies: Arc<StrategyFactory>,
    arranger: ArrangerHandle,
}

impl ReelScheduler {
    pub fn new(pool: PgPool, strategies: Arc<StrategyFactory>, arranger: ArrangerHandle) -> Self {
        Self {
            pool,
            strategies,
            arranger,
        }
    }

    /// Create the remote container, persist the reel and arrange its
    /// publication at `input.scheduled_date`.
    pub async fn schedule_reel(
        &self,
        input: ScheduleReelInput,
        video: VideoFile,
    ) -> Result<ScheduledReel, PipelineError> {
        let client = self.load_client(input.client_id).await?;

        let identity = client.identity()?;
        if identity != input.social_identity {
            return Err(CoreError::Validation(format!(
                "Client {} is a {identity} account, not {}",
                client.id, input.social_identity
            ))
            .into());
        }

        let strategy = self.strategies.for_identity(identity)?;
        let creds = credentials_for(&client);
        let post = ReelPost {
            title: input.title.clone(),
            description: input.description.clone(),
            scheduled_date: input.scheduled_date,
        };

        let container_id = strategy
            .create_container(&creds, &post)
            .await
            .map_err(|e| CoreError::Upstream(format!("Failed to create media container: {e}")))?;

        if ReelRepo::find_by_container_id(&self.pool, &container_id)
            .await?
            .is_some()
        {
            return Err(duplicate_container(&container_id).into());
        }

        let reel = ReelRepo::create(
            &self.pool,
            &CreateReel {
                client_id: client.id,
                container_id: container_id.clone(),
                title: input.title,
                description: input.description,
                scheduled_date: input.scheduled_date,
                needs_local_publish: strategy.publishes_locally(),
            },
        )
        .await
        .map_err(|e| match e.as_database_error().and_then(|db| db.constraint()) {
            Some("uq_reels_container_id") => PipelineError::from(duplicate_container(&container_id)),
            _ => PipelineError::from(e),
        })?;

        tracing::info!(
            reel_id = reel.id,
            client_id = client.id,
            container_id = %reel.container_id,
            identity = %identity,
            scheduled_date = %reel.scheduled_date,
            "Reel persisted, scheduling publication"
        );

        let outcome = match strategy
            .schedule_publishing(&creds, &container_id, &post, &video)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                return Err(self
                    .abandon(reel.id, format!("Failed to schedule publication: {e}"))
                    .await)
            }
        };

        match outcome {
            ScheduleOutcome::Deferred { due } => {
                if !reel.needs_local_publish {
                    if let Err(e) = ReelRepo::mark_local_publish(&self.pool, reel.id).await {
                        return Err(self
                            .abandon(reel.id, format!("Failed to queue publication: {e}"))
                            .await);
                    }
                }
                self.arranger.wake();
                tracing::info!(reel_id = reel.id, due = %due, "Publication handed to arranger");
                Ok(ScheduledReel::from_reel(&reel, ReelStatus::Scheduled))
            }
            ScheduleOutcome::NativelyScheduled => {
                Ok(ScheduledReel::from_reel(&reel, ReelStatus::Scheduled))
            }
            ScheduleOutcome::Published(result) => {
                let completed = match complete_publication(
                    &self.pool,
                    strategy.as_ref(),
                    &client,
                    reel.id,
                    &result,
                )
                .await
                {
                    Ok(completed) => completed,
                    Err(e) => {
                        return Err(self
                            .abandon(reel.id, format!("Failed to complete publication: {e}"))
                            .await)
                    }
                };
                match completed {
                    Some(published) => {
                        Ok(ScheduledReel::from_reel(&published, ReelStatus::Published))
                    }
                    None => {
                        let current = ReelRepo::find_by_id(&self.pool, reel.id)
                            .await?
                            .unwrap_or(reel);
                        let status = current.status()?;
                        Ok(ScheduledReel::from_reel(&current, status))
                    }
                }
            }
        }
    }

    /// Mark a reel that can no longer be published as FAILED and build the
    /// error for the caller. A failure to record the state is logged; the
    /// original reason is what the caller needs.
    async fn abandon(&self, reel_id: DbId, reason: String) -> PipelineError {
        match ReelRepo::mark_failed(&self.pool, reel_id, &reason).await {
            Ok(_) => tracing::warn!(reel_id, reason = %reason, "Reel marked FAILED"),
            Err(e) => tracing::error!(reel_id, error = %e, "Failed to mark reel FAILED"),
        }
        CoreError::Upstream(reason).into()
    }

    /// Load a client that can be published to.
    async fn load_client(&self, client_id: DbId) -> Result<Client, PipelineError> {
        let client = ClientRepo::find_by_id(&self.pool, client_id)
            .await?
            .filter(Client::has_credentials)
            .ok_or(CoreError::NotFound {
                entity: "Client",
                id: client_id,
            })?;
        Ok(client)
    }
}

fn duplicate_container(container_id: &str) -> CoreError {
    CoreError::Conflict(format!(
        "A reel for media container {container_id} is already scheduled"
    ))
}
