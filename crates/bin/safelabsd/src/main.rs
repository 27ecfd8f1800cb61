//! # safelabsd: `SafeLabs` daemon
//!
//! Composition root that wires all adapters together, runs the automation
//! engine in the background and serves the HTTP API.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the store adapters and share them between the engine and the API
//! - Spawn the automation engine
//! - Bind to a TCP port and serve until SIGINT/SIGTERM
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use safelabs_adapter_http_axum::router;
use safelabs_adapter_http_axum::state::AppState;
use safelabs_adapter_storage_sqlite_sqlx::{SqliteEventStore, SqliteNodeStore};
use safelabs_app::audit::AuditEmitter;
use safelabs_app::automation_engine::AutomationEngine;
use safelabs_app::ports::SystemClock;
use safelabs_app::services::actuator_service::ActuatorService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = config.engine_settings()?;

    // Database
    let db = safelabs_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .with_context(|| format!("failed to open database {}", config.database_url()))?;
    let pool = db.pool().clone();

    // Stores, shared by the engine and the API
    let nodes = Arc::new(SqliteNodeStore::new(pool.clone()));
    let events = Arc::new(SqliteEventStore::new(pool));

    // Automation engine
    tracing::info!(
        devices = ?settings.devices.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "monitoring devices"
    );
    let engine = AutomationEngine::new(
        Arc::clone(&nodes),
        Arc::clone(&nodes),
        AuditEmitter::new(Arc::clone(&events)),
        SystemClock,
        settings,
    );
    let engine_task = engine.spawn();

    // HTTP
    let state = AppState::new(ActuatorService::new(nodes, AuditEmitter::new(events)));
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("safelabsd listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;

    engine_task.abort();
    tracing::info!("safelabsd stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received, stopping");
}
