use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{non_empty, respond, ApiError, ApiResult};
use crate::http::AppState;
use crate::models::{Network, Snapshot, VirtualMachine};

#[derive(Serialize)]
struct VmsBody {
    vms: Vec<VirtualMachine>,
}

#[derive(Serialize)]
struct SnapshotsBody {
    snapshots: Vec<Snapshot>,
}

#[derive(Serialize)]
struct NetworksBody {
    networks: Vec<Network>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    pub vm_name: Option<String>,
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PerformanceQuery {
    pub vm_name: Option<String>,
    pub metric_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SnapshotRequest {
    pub vm_name: Option<String>,
    pub snapshot_name: Option<String>,
    pub description: Option<String>,
}

fn body_or_400<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        warn!("rejected request body: {e}");
        ApiError::bad_request("Invalid request body")
    })
}

pub async fn list_vms(State(app): State<AppState>) -> ApiResult {
    let vms = app.client.list_virtual_machines().await;
    respond(&VmsBody { vms }, "Failed to retrieve VMs")
}

pub async fn vm_action(State(app): State<AppState>, payload: Result<Json<ActionRequest>, JsonRejection>) -> ApiResult {
    let req = body_or_400(payload)?;
    let (Some(vm_name), Some(action)) = (non_empty(req.vm_name), non_empty(req.action)) else {
        return Err(ApiError::bad_request("Missing required parameters"));
    };

    if app.client.perform_action(&vm_name, &action).await {
        info!("action {action} accepted for VM {vm_name}");
        Ok(Json(json!({
            "status": "success",
            "message": format!("Successfully performed {action} on VM {vm_name}"),
        })))
    } else {
        Err(ApiError::failed(format!("Failed to perform {action} on VM {vm_name}")))
    }
}

pub async fn vm_performance(State(app): State<AppState>, query: Result<Query<PerformanceQuery>, QueryRejection>) -> ApiResult {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let vm_name = non_empty(query.vm_name).ok_or_else(|| ApiError::bad_request("Missing VM name"))?;
    let metric_type = non_empty(query.metric_type).unwrap_or_else(|| "cpu".to_string());

    let vm = app
        .client
        .find_vm_by_name(&vm_name)
        .await
        .ok_or_else(|| ApiError::not_found("VM not found"))?;
    match app.client.get_performance_metrics(&vm, &metric_type).await {
        Some(series) => respond(&series, "Failed to retrieve performance metrics"),
        None => Ok(Json(json!({}))),
    }
}

pub async fn vm_snapshots(State(app): State<AppState>, Path(vm_name): Path<String>) -> ApiResult {
    let snapshots = app.client.get_vm_snapshots(&vm_name).await;
    respond(&SnapshotsBody { snapshots }, "Failed to retrieve snapshots")
}

pub async fn create_snapshot(
    State(app): State<AppState>,
    payload: Result<Json<SnapshotRequest>, JsonRejection>,
) -> ApiResult {
    let req = body_or_400(payload)?;
    let (Some(vm_name), Some(snapshot_name)) = (non_empty(req.vm_name), non_empty(req.snapshot_name)) else {
        return Err(ApiError::bad_request("Missing required parameters"));
    };
    let description = req.description.unwrap_or_default();

    if app.client.create_snapshot(&vm_name, &snapshot_name, &description).await {
        Ok(Json(json!({
            "status": "success",
            "message": format!("Successfully created snapshot {snapshot_name}"),
        })))
    } else {
        Err(ApiError::failed("Failed to create snapshot"))
    }
}

pub async fn vm_networks(State(app): State<AppState>, Path(vm_name): Path<String>) -> ApiResult {
    let networks = app.client.get_vm_networks(&vm_name).await;
    respond(&NetworksBody { networks }, "Failed to retrieve networks")
}
