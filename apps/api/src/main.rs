//! Rantboard API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dto;
mod error;
mod handlers;
mod middleware;
mod request_context;
mod state;
mod sweeper;

use std::net::SocketAddr;
use std::sync::Arc;

use rantboard_application::Clock;
use rantboard_core::AppError;
use rantboard_infrastructure::{Argon2PasswordHasher, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api_config::{ApiConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let app_state =
        api_services::build_app_state(&config, clock, Arc::new(Argon2PasswordHasher::new()))
            .await?;

    let shutdown = CancellationToken::new();
    let sweepers = sweeper::spawn_sweepers(&app_state, &config, &shutdown);
    let app = api_router::build_router(app_state, &config.frontend_url)?;

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "rantboard-api listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")));

    shutdown.cancel();
    for handle in sweepers {
        if let Err(error) = handle.await {
            warn!(%error, "sweeper task ended abnormally");
        }
    }

    served
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }

    info!("shutdown signal received, draining connections");
}
