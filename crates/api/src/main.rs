use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cadence_meta::{GraphClient, StrategyFactory};
use cadence_pipeline::{Arranger, ReelScheduler, WebhookReconciler};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_api::background;
use cadence_api::bootstrap::{ensure_operator, BootstrapAccount};
use cadence_api::config::ServerConfig;
use cadence_api::router::build_app_router;
use cadence_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_api=debug,cadence_pipeline=debug,cadence_meta=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = cadence_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    cadence_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    cadence_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- First-run operator ---
    if let Some(account) = BootstrapAccount::from_env() {
        ensure_operator(&pool, &account, config.password_hash_cost)
            .await
            .expect("Failed to create bootstrap operator");
    }

    // --- Platform strategies ---
    let graph = GraphClient::new(config.graph.clone()).expect("Failed to build Graph API client");
    let strategies = Arc::new(StrategyFactory::graph(graph));
    tracing::info!(strategies = ?strategies, "Platform strategies registered");

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    // The first sweep publishes anything that fell due while we were down.
    let arranger = Arranger::new(pool.clone(), Arc::clone(&strategies), config.arranger.clone());
    let arranger_handle = arranger.handle();
    let arranger_cancel = cancel.clone();
    let arranger_task = tokio::spawn(async move {
        arranger.run(arranger_cancel).await;
    });

    let cleanup_task = tokio::spawn(background::token_cleanup::run(pool.clone(), cancel.clone()));

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        strategies: Arc::clone(&strategies),
        scheduler: ReelScheduler::new(pool.clone(), Arc::clone(&strategies), arranger_handle),
        reconciler: WebhookReconciler::new(pool),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Reels claimed mid-shutdown keep their lease and are retried after restart.
    cancel.cancel();
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    drain("arranger", arranger_task, timeout).await;
    drain("token cleanup", cleanup_task, timeout).await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a cancelled background task, giving up after `timeout`.
async fn drain(name: &str, task: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => tracing::info!(task = name, "Background task stopped"),
        Ok(Err(e)) => tracing::error!(task = name, error = %e, "Background task panicked"),
        Err(_) => tracing::warn!(task = name, "Background task did not stop in time"),
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
