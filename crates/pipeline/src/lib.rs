//! The reel publishing pipeline.
//!
//! - [`orchestrator`] -- [`ReelScheduler`], the ordered container / persist /
//!   schedule workflow behind `POST /reels/schedule-reel`.
//! - [`arranger`] -- the durable delayed-publish loop. The reel row is the
//!   job; nothing lives only in memory.
//! - [`reconciler`] -- applies "video published" webhook deliveries.
//! - [`publish`] -- the completion step both paths share.

pub mod arranger;
pub mod error;
pub mod orchestrator;
pub mod publish;
pub mod reconciler;

pub use arranger::{Arranger, ArrangerConfig, ArrangerHandle, FireOutcome, SweepReport};
pub use error::PipelineError;
pub use orchestrator::{ReelScheduler, ScheduleReelInput, ScheduledReel};
pub use reconciler::{ReconcileReport, WebhookReconciler};
