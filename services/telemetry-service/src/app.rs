use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::DEFAULT_ALLOWED_ORIGIN;
use crate::handlers::{
    check_time, healthz, hello, log_answers, log_event, log_result, read_only, readyz, write_only,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let origin = allowed_origin(&state.config.allowed_origin);

    let public_read = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    let origin_read = CorsLayer::new()
        .allow_origin(origin.clone())
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    let origin_write = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    // The cors layers answer every OPTIONS request before it reaches a handler.
    // get() would also serve HEAD, so HEAD is routed to the 405 handler.
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/api/hello",
            get(hello)
                .head(read_only)
                .fallback(read_only)
                .layer(public_read),
        )
        .route(
            "/api/check-time",
            get(check_time)
                .head(read_only)
                .fallback(read_only)
                .layer(origin_read),
        )
        .route(
            "/api/log-event",
            post(log_event)
                .fallback(write_only)
                .layer(origin_write.clone()),
        )
        .route(
            "/api/log-answers",
            post(log_answers)
                .fallback(write_only)
                .layer(origin_write.clone()),
        )
        .route(
            "/api/log-result",
            post(log_result)
                .fallback(write_only)
                .layer(origin_write),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn allowed_origin(configured: &str) -> AllowOrigin {
    match HeaderValue::from_str(configured) {
        Ok(value) => AllowOrigin::exact(value),
        Err(err) => {
            tracing::warn!(
                origin = configured,
                error = %err,
                "invalid ALLOWED_ORIGIN, using default"
            );
            AllowOrigin::exact(HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN))
        }
    }
}
