mod app;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod service;
mod state;
mod store;
mod validate;

use std::{process::ExitCode, sync::Arc};

use quiztrack_common::{bind_listener, init_tracing, shutdown_signal};

use crate::config::ServiceConfig;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = init_tracing("telemetry-service");

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    // One client for the life of the process, shared by every handler.
    let store = match PgStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(error = %err, "connect db failed");
            return ExitCode::FAILURE;
        }
    };

    let port = config.port;
    tracing::info!(
        port,
        environment = config.environment.as_str(),
        allowed_origin = config.allowed_origin.as_str(),
        "starting telemetry-service"
    );
    let app = app::build_router(AppState::new(Arc::new(store), config));

    let listener = match bind_listener(port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port, "bind listener failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
