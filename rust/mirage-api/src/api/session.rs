//! Session endpoints: power, shell commands, and snapshots.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::machines::phase_name;
use crate::domain::{Snapshot, Turn};
use crate::runtime::ShellOutcome;
use crate::AppState;

/// Create the session router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/session", get(get_session))
        .route("/v1/session/start", post(start_session))
        .route("/v1/session/stop", post(stop_session))
        .route("/v1/session/commands", post(submit_command))
        .route("/v1/session/snapshots", post(take_snapshot))
}

/// Session read model.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Session phase name: `idle`, `booting` or `running`.
    pub phase: &'static str,
    /// Machine occupying the session.
    pub vm_id: Option<String>,
    /// Current session generation.
    pub generation: u64,
    /// Boot lines revealed so far.
    pub boot_lines: Vec<&'static str>,
    /// Live transcript while running.
    pub transcript: Vec<Turn>,
    /// Disk activity indicator.
    pub disk_active: bool,
}

/// Current session state.
async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(state.simulator.read(|c| SessionResponse {
        phase: phase_name(c.phase()),
        vm_id: c.session_vm_id().map(str::to_string),
        generation: c.generation(),
        boot_lines: c.boot_lines(),
        transcript: c.transcript().map(|t| t.turns().to_vec()).unwrap_or_default(),
        disk_active: c.is_disk_active(),
    }))
}

/// Power state change response.
#[derive(Debug, Serialize)]
pub struct PowerResponse {
    /// Whether the state changed.
    pub applied: bool,
    /// Machine affected.
    pub vm_id: Option<String>,
}

/// Power on the selected machine.
async fn start_session(State(state): State<AppState>) -> Json<PowerResponse> {
    match state.simulator.start() {
        Some(ticket) => Json(PowerResponse {
            applied: true,
            vm_id: Some(ticket.vm_id),
        }),
        None => Json(PowerResponse {
            applied: false,
            vm_id: state
                .simulator
                .read(|c| c.registry().selected_id().map(str::to_string)),
        }),
    }
}

/// Power off the active machine.
async fn stop_session(State(state): State<AppState>) -> Json<PowerResponse> {
    let vm_id = state.simulator.stop();
    Json(PowerResponse {
        applied: vm_id.is_some(),
        vm_id,
    })
}

/// Shell command request.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// Command line as typed.
    pub command: String,
}

/// Shell command response.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Whether the command was accepted.
    pub applied: bool,
    /// What happened to it.
    pub outcome: ShellOutcome,
    /// Transcript after the reply was applied.
    pub transcript: Vec<Turn>,
}

/// Submit one command and wait for its reply.
async fn submit_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let outcome = state.simulator.submit(&req.command).await;
    let transcript = state
        .simulator
        .read(|c| c.transcript().map(|t| t.turns().to_vec()))
        .unwrap_or_default();

    Json(CommandResponse {
        applied: outcome != ShellOutcome::Ignored,
        outcome,
        transcript,
    })
}

/// Snapshot response.
#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    /// Whether a snapshot was taken.
    pub applied: bool,
    /// The new snapshot.
    pub snapshot: Option<Snapshot>,
}

/// Snapshot the running machine.
async fn take_snapshot(State(state): State<AppState>) -> Json<SnapshotResponse> {
    let snapshot = state.simulator.take_snapshot();
    Json(SnapshotResponse {
        applied: snapshot.is_some(),
        snapshot,
    })
}
