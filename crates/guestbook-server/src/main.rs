//! Guestbook server entry point.
//!
//! Loads configuration, connects to the document store, then starts the
//! Axum HTTP server with graceful shutdown. A background supervisor keeps
//! the store connection healthy and is stopped on shutdown.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use guestbook_server::build_router;
use guestbook_server::config::ServerConfig;
use guestbook_server::state::AppState;
use guestbook_storage::{StoreClient, UriConnector, redact_uri};

#[tokio::main]
async fn main() -> ExitCode {
    let config = ServerConfig::from_env();

    // Logging comes up before the config error is reported.
    let log_level = config.as_ref().map_or("info", |c| c.log_level.as_str());
    init_tracing(log_level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "guestbook server failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .json()
        .init();
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        database = %redact_uri(&config.database_url),
        static_dir = %config.static_dir.display(),
        "guestbook starting"
    );

    let connector = UriConnector::new(&config.database_url);
    #[cfg(feature = "postgres-backend")]
    let connector = connector.with_postgres_options(config.postgres_options());

    let store = Arc::new(
        StoreClient::connect(Arc::new(connector), config.db_retry_policy())
            .await
            .context("failed to connect to document store")?,
    );
    info!("document store connected");

    let config = Arc::new(config);
    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::clone(&store)));

    // Shutdown signal channel.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let supervisor_handle = {
        let store = Arc::clone(&store);
        let mut rx = shutdown_rx;
        let interval = config.db_health_interval;
        tokio::spawn(async move {
            store.supervise(interval, &mut rx).await;
        })
    };

    let app = build_router(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "guestbook server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_tx))
    .await
    .context("server error")?;

    info!("waiting for store supervisor to stop");
    if tokio::time::timeout(Duration::from_secs(10), supervisor_handle)
        .await
        .is_err()
    {
        tracing::warn!("store supervisor did not stop in time");
    }

    info!("guestbook server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
