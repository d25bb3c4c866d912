use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corral_api::config::ServerConfig;
use corral_api::router::build_app_router;
use corral_api::state::AppState;
use corral_condor::CondorCli;
use corral_core::gridmap::GridMap;
use corral_core::netlogger::NetLogger;
use corral_events::EventQueue;
use corral_service::{cleaner, recovery, ResourceEventHandler, ServiceConfig, Services};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "corral_api=debug,corral_service=debug,corral_condor=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let service_config = ServiceConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        home = %service_config.home.display(),
        "Loaded server configuration"
    );

    std::fs::create_dir_all(&service_config.working_directory)
        .expect("Failed to create working directory");

    // --- Database ---
    let pool = corral_db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    corral_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    corral_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Grid identity ---
    let gridmap = match GridMap::load(&service_config.gridmap_file) {
        Ok(map) => {
            tracing::info!(entries = map.len(), "Loaded grid-mapfile");
            map
        }
        Err(e) => {
            tracing::warn!(
                path = %service_config.gridmap_file.display(),
                error = %e,
                "Unable to read grid-mapfile, no users will be authorized"
            );
            GridMap::default()
        }
    };

    let netlogger =
        NetLogger::open(&service_config.netlogger_file).expect("Failed to open NetLogger file");

    // --- Services ---
    let cancel = CancellationToken::new();
    let condor = Arc::new(CondorCli::new(
        &service_config.condor_home,
        &service_config.condor_config,
    ));
    let (queue, receiver) = EventQueue::new();
    let services = Arc::new(Services::new(
        pool.clone(),
        service_config,
        queue,
        condor,
        netlogger,
        cancel.clone(),
    ));

    let handler = Arc::new(ResourceEventHandler::new(Arc::clone(&services)));
    let dispatcher_handle = tokio::spawn(EventQueue::run(receiver, handler, cancel.clone()));

    if let Err(e) = recovery::recover_all(&services).await {
        tracing::error!(error = %e, "Resource recovery failed");
    }

    let cleaner_handle = tokio::spawn(cleaner::run(Arc::clone(&services), cancel.clone()));
    tracing::info!("Background services started (dispatcher, cleaner)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        services: Arc::clone(&services),
        gridmap: Arc::new(gridmap),
    };

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

    cancel.cancel();
    let timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(timeout, dispatcher_handle).await;
    let _ = tokio::time::timeout(timeout, cleaner_handle).await;
    if tokio::time::timeout(timeout, services.join_tailers()).await.is_err() {
        tracing::warn!("Timed out waiting for log tailers");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
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
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
