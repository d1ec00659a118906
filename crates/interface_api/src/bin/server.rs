//! Clinic Billing Core - API Server Binary
//!
//! This binary starts the HTTP API server for the clinic billing core.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin clinic-billing-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin clinic-billing-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_DATABASE_MIN_CONNECTIONS` - Connections kept open (default: 2)
//! * `API_DATABASE_ACQUIRE_TIMEOUT_SECS` - Wait for a pooled connection (default: 30)
//! * `API_DATABASE_IDLE_TIMEOUT_SECS` - Idle connection lifetime (default: 600)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_PROVIDER__BASE_URL` - Boleto provider base URL
//! * `API_PROVIDER__CLIENT_ID` - Boleto provider integration client id
//! * `API_PROVIDER__CERTIFICATE_PATH` - PEM client certificate
//! * `API_PROVIDER__PRIVATE_KEY_PATH` - PEM private key
//! * `API_PROVIDER__DEFAULT_STATE` - State used for patients without one (default: SP)

use std::net::SocketAddr;

use anyhow::Context;
use interface_api::{config::ApiConfig, create_router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main entry point for the API server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Database connection or migrations fail
/// - The provider's client certificate cannot be loaded
/// - Server fails to bind to the configured address
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        provider = %config.provider.base_url,
        "Starting Clinic Billing API Server"
    );

    tracing::info!("Connecting to database...");
    let pool = infra_db::create_pool(config.database_config())
        .await
        .context("database connection failed")?;

    tracing::info!("Running database migrations...");
    infra_db::run_migrations(&pool)
        .await
        .context("database migrations failed")?;

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .context("invalid server address")?;

    let state = AppState::postgres(pool, config).context("boleto provider setup failed")?;
    let app = create_router(state);

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
