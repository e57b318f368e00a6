use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};

use crate::error::ServiceError;
use crate::models::{CheckTimeResponse, HelloResponse, MessageResponse, PayloadType, ServerTime};
use crate::service;
use crate::state::AppState;

pub const READ_METHODS: &str = "GET, OPTIONS";
pub const WRITE_METHODS: &str = "POST, OPTIONS";

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz(State(state): State<AppState>) -> StatusCode {
    match state.store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn read_only() -> ServiceError {
    ServiceError::method_not_allowed(READ_METHODS)
}

pub async fn write_only() -> ServiceError {
    ServiceError::method_not_allowed(WRITE_METHODS)
}

pub async fn hello(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello, World!",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.config.environment.clone(),
    })
}

pub async fn check_time(State(state): State<AppState>) -> Json<CheckTimeResponse> {
    let now = Utc::now();
    Json(CheckTimeResponse {
        message: "Server time",
        server_time: ServerTime {
            iso: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            unix_seconds: now.timestamp(),
            unix_millis: now.timestamp_millis(),
            rfc2822: now.to_rfc2822(),
        },
        timezone: "UTC",
        environment: state.config.environment.clone(),
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn log_event(State(state): State<AppState>, body: Bytes) -> Response {
    ingest(&state, &body, None).await
}

pub async fn log_answers(State(state): State<AppState>, body: Bytes) -> Response {
    ingest(&state, &body, Some(PayloadType::Answers)).await
}

pub async fn log_result(State(state): State<AppState>, body: Bytes) -> Response {
    ingest(&state, &body, Some(PayloadType::Result)).await
}

async fn ingest(state: &AppState, body: &[u8], expected: Option<PayloadType>) -> Response {
    match service::ingest(state.store.as_ref(), &state.config, body, expected).await {
        Ok(accepted) => (accepted.status, Json(MessageResponse::ok(accepted.message))).into_response(),
        Err(err) => err.into_response(),
    }
}
