//! HTTP API endpoints.
//!
//! Each presentation event maps to one endpoint. Operations the simulator
//! refuses (starting while another machine runs, snapshotting an idle
//! session) answer `200` with `"applied": false`; unknown machine ids answer
//! `404`.

pub mod events;
pub mod health;
pub mod machines;
pub mod session;

use axum::Router;

use crate::AppState;

/// Create the API router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(machines::router())
        .merge(session::router())
        .merge(events::router())
}
