/**
 * API REST vSPHERE MANAGER - Serveur HTTP du dashboard
 *
 * RÔLE :
 * Expose l'inventaire vSphere et les opérations sur les VMs en JSON pour le
 * dashboard web.
 *
 * ROUTES :
 * - /health, /login, /logout, /api/session
 * - /api/vms, /api/vm/action, /api/vm/performance, /api/vm/snapshot
 * - /api/vm/{name}/snapshots, /api/vm/{name}/networks
 * - /api/hosts, /api/host/{name}/performance
 *
 * ERREURS : toujours `{"error": ...}`, 404 JSON pour les routes inconnues.
 */

use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{self, OperatorSessions};
use crate::config::ManagerConfig;
use crate::controllers::{host, vm};
use crate::session::SessionStore;
use crate::vsphere::ManagementClient;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub client: ManagementClient,
    pub operators: OperatorSessions,
    pub cfg: Arc<ManagerConfig>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>, cfg: ManagerConfig) -> Self {
        Self {
            client: ManagementClient::new(sessions.clone()),
            operators: OperatorSessions::new(cfg.auth.cookie_name.clone()),
            sessions,
            cfg: Arc::new(cfg),
        }
    }
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/api/session", get(auth::session_info))
        .route("/api/vms", get(vm::list_vms))
        .route("/api/vm/action", post(vm::vm_action))
        .route("/api/vm/performance", get(vm::vm_performance))
        .route("/api/vm/snapshot", post(vm::create_snapshot))
        .route("/api/vm/{name}/snapshots", get(vm::vm_snapshots))
        .route("/api/vm/{name}/networks", get(vm::vm_networks))
        .route("/api/hosts", get(host::list_hosts))
        .route("/api/host/{name}/performance", get(host::host_performance))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(app_state.clone(), auth::require_session))
        .with_state(app_state)
}
