//! Pushwatch API Server
//!
//! This crate provides the HTTP server for Pushwatch, a push gateway whose
//! metrics are registered at runtime and whose prefixes can be watched for
//! staleness.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `POST /register` and `POST /store` for defining series and pushing values
//! - `GET /metrics` serving everything in the Prometheus text format
//! - `GET /health` for load balancers
//!
//! Prefix watches are audited by the registry's scheduler, which runs for
//! the lifetime of the server.
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod error;
pub mod metrics;
mod routes;
mod state;

pub use config::{Config, LogFormat};
pub use error::ApiError;
pub use state::AppState;

use anyhow::Result;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the Pushwatch API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Pushwatch API server with the provided configuration.
///
/// The scheduler is started before the listener is bound and stopped once
/// the server has drained.
///
/// # Errors
///
/// Returns an error if:
/// - The address is invalid or the server fails to bind to it
/// - The scheduler cannot be started
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Pushwatch API server starting"
    );

    let state = AppState::with_new_registry()?;
    let scheduler = std::sync::Arc::clone(state.registry().scheduler());
    scheduler.start()?;

    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.stop();
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::register_routes(state.clone()))
        .merge(routes::store_routes(state.clone()))
        .merge(routes::exposition_routes(state.clone()))
        .merge(routes::health_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            state,
            metrics::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
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
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
