//! # smarthomed: smarthome daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize tracing
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repositories, the HTTP dispatcher, the runners and the
//!   job scheduler
//! - Restore recurring and pending delayed jobs, then start the scheduler
//! - Bind to a TCP port and serve the REST API
//! - Handle graceful shutdown (SIGTERM/SIGINT), then stop the scheduler
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use smarthome_adapter_dispatch_reqwest::HttpDispatcher;
use smarthome_adapter_http_axum::router;
use smarthome_adapter_http_axum::state::{AppState, Backend, Repositories};
use smarthome_adapter_storage_sqlite_sqlx::{
    SqliteActionRepository, SqliteAutomationRepository, SqliteControllerRepository,
    SqliteDelayedTaskRepository, SqliteRecurringTaskRepository,
};
use smarthome_app::ports::SystemClock;

use crate::config::Config;

/// Production adapter set: `SQLite` storage, HTTP devices, wall clock.
struct Production;

impl Backend for Production {
    type Actions = Arc<SqliteActionRepository>;
    type Controllers = Arc<SqliteControllerRepository>;
    type Automations = Arc<SqliteAutomationRepository>;
    type Recurring = Arc<SqliteRecurringTaskRepository>;
    type Delayed = Arc<SqliteDelayedTaskRepository>;
    type Dispatcher = HttpDispatcher;
    type Clock = SystemClock;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = smarthome_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .with_context(|| format!("failed to open database {}", config.database_url()))?;
    let pool = db.pool().clone();

    // Repositories
    let repos = Repositories::<Production> {
        actions: Arc::new(SqliteActionRepository::new(pool.clone())),
        controllers: Arc::new(SqliteControllerRepository::new(pool.clone())),
        automations: Arc::new(SqliteAutomationRepository::new(pool.clone())),
        recurring: Arc::new(SqliteRecurringTaskRepository::new(pool.clone())),
        delayed: Arc::new(SqliteDelayedTaskRepository::new(pool)),
    };

    // Devices
    let dispatcher = HttpDispatcher::new(&config.dispatcher_config())
        .context("failed to build device dispatcher")?;

    // Engine
    let state = AppState::new(repos, dispatcher, SystemClock, config.engine_config());
    let report = state
        .scheduler
        .restore()
        .await
        .context("failed to restore scheduled jobs")?;
    tracing::info!(
        recurring = report.recurring,
        delayed = report.delayed,
        "scheduled jobs restored"
    );
    let scheduler = state.scheduler.start();

    // HTTP
    let app = router::build(state);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "smarthomed listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    scheduler.stop().await;
    tracing::info!("smarthomed stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
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
    tracing::info!("shutdown requested");
}
