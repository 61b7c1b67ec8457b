//! Durable delayed-publish arranger.
//!
//! Reels whose platform cannot publish them at a future time carry
//! `needs_local_publish = true`. The [`Arranger`] claims those rows once
//! their `scheduled_date` has passed and publishes them. Claims are leased:
//! a claim older than the lease (the process holding it died) is taken
//! again on a later sweep. The first sweep after startup picks up anything
//! that fell due while the process was down.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::types::Timestamp;
use cadence_db::models::reel::Reel;
use cadence_db::repositories::{ClientRepo, ReelRepo};
use cadence_meta::{ReelPost, StrategyFactory};
use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::publish::{complete_publication, credentials_for};

/// Default upper bound on the sleep between sweeps.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default claim lease.
const DEFAULT_CLAIM_LEASE_SECS: i64 = 600;

/// Maximum reels claimed by one sweep.
const DEFAULT_BATCH_SIZE: i64 = 25;

/// Pause before retrying a reel whose container was still processing.
const NOT_READY_RETRY: Duration = Duration::from_secs(15);

/// Tuning knobs for [`Arranger`].
#[derive(Debug, Clone)]
pub struct ArrangerConfig {
    pub poll_interval: Duration,
    pub claim_lease: chrono::Duration,
    pub batch_size: i64,
}

impl Default for ArrangerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            claim_lease: chrono::Duration::seconds(DEFAULT_CLAIM_LEASE_SECS),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Wakes a running [`Arranger`] ahead of its timer. Cheap to clone.
#[derive(Clone, Default)]
pub struct ArrangerHandle {
    notify: Arc<Notify>,
}

impl ArrangerHandle {
    /// Ask for an immediate sweep. A wake while a sweep is running is kept
    /// and triggers one more sweep right after it.
    pub fn wake(&self) {
        self.notify.notify_one();
    }
}

/// How a single claimed reel ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Published,
    /// Another path (usually the webhook) completed the reel first.
    AlreadyCompleted,
    /// The platform was not ready; the claim was dropped for a later sweep.
    Released,
    Failed,
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub claimed: usize,
    pub published: usize,
    pub already_completed: usize,
    pub released: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: FireOutcome) {
        match outcome {
            FireOutcome::Published => self.published += 1,
            FireOutcome::AlreadyCompleted => self.already_completed += 1,
            FireOutcome::Released => self.released += 1,
            FireOutcome::Failed => self.failed += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Arranger
// ---------------------------------------------------------------------------

/// Background service that publishes locally arranged reels when due.
pub struct Arranger {
    pool: PgPool,
    strategies: Arc<StrategyFactory>,
    config: ArrangerConfig,
    handle: ArrangerHandle,
}

impl Arranger {
    pub fn new(pool: PgPool, strategies: Arc<StrategyFactory>, config: ArrangerConfig) -> Self {
        Self {
            pool,
            strategies,
            config,
            handle: ArrangerHandle::default(),
        }
    }

    /// A handle that wakes this arranger.
    pub fn handle(&self) -> ArrangerHandle {
        self.handle.clone()
    }

    /// Run the arranger loop until `cancel` fires.
    ///
    /// Each iteration sweeps, then sleeps until the earliest pending
    /// `scheduled_date` (capped at the poll interval) or a wake-up.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            poll_secs = self.config.poll_interval.as_secs(),
            lease_secs = self.config.claim_lease.num_seconds(),
            "Arranger started"
        );

        loop {
            let wait = match self.sweep(Utc::now()).await {
                // A full batch means more rows may already be due.
                Ok(report) if report.claimed as i64 >= self.config.batch_size => Duration::ZERO,
                Ok(_) => self.next_wait().await,
                Err(e) => {
                    tracing::error!(error = %e, "Arranger sweep failed");
                    self.config.poll_interval
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Arranger cancelled");
                    break;
                }
                _ = self.handle.notify.notified() => {}
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Claim every reel due at `now` and fire them concurrently.
    ///
    /// Waits for all fired reels before returning.
    pub async fn sweep(&self, now: Timestamp) -> Result<SweepReport, PipelineError> {
        let stale_before = now - self.config.claim_lease;
        let claimed =
            ReelRepo::claim_due(&self.pool, now, stale_before, self.config.batch_size).await?;

        let mut report = SweepReport {
            claimed: claimed.len(),
            ..Default::default()
        };
        if claimed.is_empty() {
            return Ok(report);
        }
        tracing::info!(count = claimed.len(), "Arranger claimed due reels");

        let mut tasks = JoinSet::new();
        for reel in claimed {
            let pool = self.pool.clone();
            let strategies = Arc::clone(&self.strategies);
            tasks.spawn(async move {
                let reel_id = reel.id;
                match fire(&pool, &strategies, reel).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        // The claim stays in place and expires with the lease.
                        tracing::error!(reel_id, error = %e, "Failed to fire reel");
                        FireOutcome::Released
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => tracing::error!(error = %e, "Arranger task panicked"),
            }
        }

        tracing::info!(
            published = report.published,
            already_completed = report.already_completed,
            released = report.released,
            failed = report.failed,
            "Arranger sweep finished"
        );
        Ok(report)
    }

    /// Time until the next pending reel is due, capped at the poll interval.
    async fn next_wait(&self) -> Duration {
        match ReelRepo::next_due_at(&self.pool).await {
            Ok(Some(due)) => {
                let until = (due - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                // Anything already overdue here was released as not ready.
                let until = if until.is_zero() { NOT_READY_RETRY } else { until };
                until.min(self.config.poll_interval)
            }
            Ok(None) => self.config.poll_interval,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read next due reel");
                self.config.poll_interval
            }
        }
    }
}

/// Publish one claimed reel.
///
/// A reel whose client was deleted or lost its credentials is failed
/// rather than published.
async fn fire(
    pool: &PgPool,
    strategies: &StrategyFactory,
    reel: Reel,
) -> Result<FireOutcome, PipelineError> {
    let client = match reel.client_id {
        Some(client_id) => ClientRepo::find_by_id(pool, client_id).await?,
        None => None,
    };
    let Some(client) = client else {
        return fail(pool, &reel, "Client was deleted before publication").await;
    };
    if !client.has_credentials() {
        return fail(pool, &reel, "Client has no platform credentials").await;
    }

    let strategy = match client.identity() {
        Ok(identity) => match strategies.for_identity(identity) {
            Ok(strategy) => strategy,
            Err(e) => return fail(pool, &reel, &e.to_string()).await,
        },
        Err(e) => return fail(pool, &reel, &e.to_string()).await,
    };

    let post = ReelPost {
        title: reel.title.clone(),
        description: reel.description.clone(),
        scheduled_date: reel.scheduled_date,
    };
    let result = match strategy
        .publish_immediately(&credentials_for(&client), &reel.container_id, &post)
        .await
    {
        Ok(result) => result,
        Err(e) if e.is_retryable() => {
            ReelRepo::release_claim(pool, reel.id).await?;
            tracing::info!(reel_id = reel.id, reason = %e, "Reel not ready, will retry");
            return Ok(FireOutcome::Released);
        }
        Err(e) => return fail(pool, &reel, &format!("Publish failed: {e}")).await,
    };

    match complete_publication(pool, strategy.as_ref(), &client, reel.id, &result).await? {
        Some(_) => Ok(FireOutcome::Published),
        None => Ok(FireOutcome::AlreadyCompleted),
    }
}

async fn fail(pool: &PgPool, reel: &Reel, reason: &str) -> Result<FireOutcome, PipelineError> {
    match ReelRepo::mark_failed(pool, reel.id, reason).await? {
        Some(_) => {
            tracing::warn!(reel_id = reel.id, reason, "Reel marked FAILED");
            Ok(FireOutcome::Failed)
        }
        None => Ok(FireOutcome::AlreadyCompleted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_tallies_outcomes() {
        let mut report = SweepReport::default();
        for outcome in [
            FireOutcome::Published,
            FireOutcome::Published,
            FireOutcome::Released,
            FireOutcome::Failed,
            FireOutcome::AlreadyCompleted,
        ] {
            report.record(outcome);
        }
        assert_eq!(report.published, 2);
        assert_eq!(report.released, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.already_completed, 1);
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = ArrangerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.claim_lease.num_seconds(), 600);
    }
}
