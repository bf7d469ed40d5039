//! Machine catalog endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::domain::{OsFamily, VirtualMachine};
use crate::runtime::{SessionPhase, SettingsPatch};
use crate::AppState;

/// Create the machines router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/machines", get(list_machines).post(create_machine))
        .route("/v1/machines/{vm_id}", get(get_machine).patch(update_machine))
        .route("/v1/machines/{vm_id}/select", post(select_machine))
}

/// Catalog read model.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    /// Machines in catalog order.
    pub machines: Vec<VirtualMachine>,
    /// Currently selected machine.
    pub selected_id: Option<String>,
    /// Session phase name: `idle`, `booting` or `running`.
    pub phase: &'static str,
    /// Machine occupying the session, if any.
    pub session_vm_id: Option<String>,
}

/// Name of a session phase as reported over HTTP.
pub(crate) fn phase_name(phase: &SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "idle",
        SessionPhase::Booting(_) => "booting",
        SessionPhase::Running(_) => "running",
    }
}

/// List machines with the current selection.
async fn list_machines(State(state): State<AppState>) -> Json<CatalogResponse> {
    Json(state.simulator.read(|c| CatalogResponse {
        machines: c.registry().list().to_vec(),
        selected_id: c.registry().selected_id().map(str::to_string),
        phase: phase_name(c.phase()),
        session_vm_id: c.session_vm_id().map(str::to_string),
    }))
}

/// Create machine request.
#[derive(Debug, Deserialize)]
pub struct CreateMachineRequest {
    /// Display name.
    pub name: String,
    /// OS family.
    pub os_family: OsFamily,
    /// Base memory in MB.
    pub memory_mb: u32,
}

/// Create a machine.
async fn create_machine(
    State(state): State<AppState>,
    Json(req): Json<CreateMachineRequest>,
) -> Result<(StatusCode, Json<VirtualMachine>), StatusCode> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let vm = state.simulator.create_vm(name, req.os_family, req.memory_mb);
    Ok((StatusCode::CREATED, Json(vm)))
}

/// Get one machine.
async fn get_machine(
    State(state): State<AppState>,
    Path(vm_id): Path<String>,
) -> Result<Json<VirtualMachine>, StatusCode> {
    state
        .simulator
        .read(|c| c.registry().get(&vm_id).cloned())
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Result of a settings update.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    /// Whether the settings were replaced.
    pub applied: bool,
    /// Machine record after the call.
    pub machine: VirtualMachine,
}

/// Replace a machine's settings.
async fn update_machine(
    State(state): State<AppState>,
    Path(vm_id): Path<String>,
    Json(mut patch): Json<SettingsPatch>,
) -> Result<Json<UpdateResponse>, StatusCode> {
    if state.simulator.read(|c| c.registry().get(&vm_id).is_none()) {
        return Err(StatusCode::NOT_FOUND);
    }

    if let Some(name) = patch.name.take() {
        let name = name.trim();
        if name.is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
        patch.name = Some(name.to_string());
    }

    let applied = state.simulator.update_settings(&vm_id, &patch);
    let machine = state
        .simulator
        .read(|c| c.registry().get(&vm_id).cloned())
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(UpdateResponse { applied, machine }))
}

/// Result of a selection change.
#[derive(Debug, Serialize)]
pub struct SelectResponse {
    /// Whether the selection moved.
    pub applied: bool,
    /// Selected machine after the call.
    pub selected_id: Option<String>,
}

/// Select a machine.
async fn select_machine(
    State(state): State<AppState>,
    Path(vm_id): Path<String>,
) -> Result<Json<SelectResponse>, StatusCode> {
    if state.simulator.read(|c| c.registry().get(&vm_id).is_none()) {
        return Err(StatusCode::NOT_FOUND);
    }

    let applied = state.simulator.select_vm(&vm_id);
    let selected_id = state
        .simulator
        .read(|c| c.registry().selected_id().map(str::to_string));

    Ok(Json(SelectResponse {
        applied,
        selected_id,
    }))
}
