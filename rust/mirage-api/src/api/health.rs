//! Health check endpoints.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check response.
#[derive(Debug, Serialize)]
struct ReadinessResponse {
    status: &'static str,
    generator: String,
    api_key_configured: bool,
    machines: usize,
}

/// Readiness check.
///
/// The service is usable without an API key; shell commands then fail with
/// an error turn, so the flag is reported rather than gating readiness.
async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let api_key_configured = state.config.llm_settings().api_key.is_some();
    Json(ReadinessResponse {
        status: "ready",
        generator: state.simulator.generator_label(),
        api_key_configured,
        machines: state.simulator.read(|c| c.registry().len()),
    })
}
