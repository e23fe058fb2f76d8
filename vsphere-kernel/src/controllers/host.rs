use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use super::{respond, ApiResult};
use crate::http::AppState;
use crate::models::Host;

#[derive(Serialize)]
struct HostsBody {
    hosts: Vec<Host>,
}

pub async fn list_hosts(State(app): State<AppState>) -> ApiResult {
    let hosts = app.client.list_hosts().await;
    respond(&HostsBody { hosts }, "Failed to retrieve hosts")
}

// TODO: brancher sur QueryPerf une fois les familles de compteurs hôte définies
pub async fn host_performance(Path(_host_name): Path<String>) -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_IMPLEMENTED, Json(json!({ "message": "Not implemented yet" })))
}
