//! # Comptoir Storefront Server
//!
//! ## Startup
//! ```text
//! RUST_LOG ──► tracing
//! storefront.toml + COMPTOIR_* ──► StorefrontConfig
//!                                        │
//!            ┌───────────────────────────┼───────────────────────────┐
//!            ▼                           ▼                           ▼
//!   SQLite (migrations,        Stripe / PayPal gateways        ShopSettings
//!   idle session purge)                  │                           │
//!            └───────────────────────────┼───────────────────────────┘
//!                                        ▼
//!                             Services ──► axum Router ──► TcpListener
//! ```

use anyhow::Context;
use chrono::{Duration, Utc};
use comptoir_checkout::Services;
use comptoir_db::{Database, DbConfig};
use comptoir_storefront::config::StorefrontConfig;
use comptoir_storefront::{build_gateways, router, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,comptoir=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Comptoir storefront...");

    let config = StorefrontConfig::load().context("Failed to load configuration")?;
    info!(
        port = config.server.port,
        database = %config.database.path.display(),
        currency = %config.shop.currency,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("Failed to open database")?;
    info!("Database ready");

    let cutoff = Utc::now() - Duration::days(i64::from(config.database.session_max_age_days));
    match db.sessions().purge_older_than(cutoff).await {
        Ok(purged) => info!(purged, "Purged idle visitor sessions"),
        Err(e) => warn!(error = %e, "Failed to purge idle visitor sessions"),
    }

    let gateways = build_gateways(&config).context("Failed to set up payment gateways")?;
    let services = Services::new(db.clone(), gateways, config.shop_settings());
    let app = router(AppState::new(db.clone(), services));

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Storefront listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, draining connections");
}
