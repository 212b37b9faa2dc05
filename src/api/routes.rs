//! HTTP routes in front of the handler

use axum::{
    Json, Router,
    body::Bytes,
    extract::State as AxumState,
    http::{HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    routing,
};
use serde_json::json;
use tracing::{Instrument, error};

use super::event::ProxyRequest;
use crate::SharedState;
use crate::logging::invocation_span;

pub const FUNCTION_ERROR_HEADER: &str = "x-function-error";

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/commit-status", routing::post(post_commit_status))
        .with_state(state)
}

/// Root health check endpoint
pub async fn root(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "function": state.function_name,
        "started_at": state.started_at,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "status": "healthy"
    }))
}

/// Runs one invocation of the commit status handler.
///
/// A hard failure still returns the handler's response, flagged with
/// `X-Function-Error: Unhandled` the way function runtimes mark a failed invocation.
pub async fn post_commit_status(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let event = ProxyRequest::from_http(&headers, &body);
    let span = invocation_span(&state.function_name, &event.request_id);

    let outcome = state
        .handler
        .handle_event(&event)
        .instrument(span.clone())
        .await;

    let mut response = outcome.response.into_response();
    if let Some(failure) = outcome.failure {
        span.in_scope(|| error!("Invocation failed: {}", failure));
        response
            .headers_mut()
            .insert(FUNCTION_ERROR_HEADER, HeaderValue::from_static("Unhandled"));
    }
    response
}
