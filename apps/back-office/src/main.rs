//! # Bistro Back Office Server
//!
//! ## Usage
//! ```bash
//! # Defaults, optionally overridden by ./bistro.toml
//! cargo run -p bistro-back-office
//!
//! # Environment overrides
//! BISTRO_PORT=9000 BISTRO_DATABASE_PATH=/tmp/bistro.db cargo run -p bistro-back-office
//! ```

use anyhow::Context;
use bistro_back_office::{init_tracing, router, AppState, BackOfficeConfig};
use bistro_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BackOfficeConfig::load().context("loading configuration")?;
    init_tracing(&config.log_filter);

    info!("Starting Bistro back office...");
    info!(
        addr = %config.bind_addr,
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.max_connections),
    )
    .await
    .context("opening database")?;
    info!("Database ready");

    let addr = config.socket_addr()?;
    let app = router(AppState::new(db.clone(), config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(?e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(?e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
