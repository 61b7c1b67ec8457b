use std::sync::Arc;

use cadence_meta::StrategyFactory;
use cadence_pipeline::{ReelScheduler, WebhookReconciler};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: cadence_db::DbPool,
    /// Server configuration (JWT secrets, cookie flags, webhook token).
    pub config: Arc<ServerConfig>,
    /// Platform strategies keyed by social identity.
    pub strategies: Arc<StrategyFactory>,
    /// Publishing orchestrator behind `POST /reels/schedule-reel`.
    pub scheduler: ReelScheduler,
    /// Applies webhook deliveries off the request path.
    pub reconciler: WebhookReconciler,
}
