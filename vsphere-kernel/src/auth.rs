/**
 * AUTH SHELL - Login opérateur et cookie de session
 *
 * RÔLE : Ouvre la connexion vSphere au nom de l'opérateur et lui remet un cookie.
 *
 * FONCTIONNEMENT :
 * - POST /login : connexion via le SessionStore, cookie `vsphere_session=<uuid>`
 * - POST /logout : efface la session opérateur, la connexion vSphere reste ouverte
 * - GET /api/session : état opérateur + état de la connexion
 * - Garde optionnelle (`auth.require_session`) devant les routes /api/...
 */

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{info, warn};
use vsphere_vim::ConnectTarget;

use crate::controllers::{non_empty, ApiError};
use crate::http::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct OperatorSession {
    pub username: String,
    pub vsphere_host: String,
    #[serde(with = "time::serde::rfc3339")]
    pub login_at: OffsetDateTime,
}

/// Sessions opérateur en mémoire, indexées par jeton de cookie
#[derive(Clone)]
pub struct OperatorSessions {
    cookie_name: String,
    sessions: Arc<Mutex<HashMap<String, OperatorSession>>>,
}

impl OperatorSessions {
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self { cookie_name: cookie_name.into(), sessions: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn open(&self, username: &str, vsphere_host: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let session = OperatorSession {
            username: username.to_string(),
            vsphere_host: vsphere_host.to_string(),
            login_at: OffsetDateTime::now_utc(),
        };
        self.sessions.lock().insert(token.clone(), session);
        token
    }

    fn token(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.cookie_name)
            .map(|(_, value)| value.to_string())
    }

    pub fn resolve(&self, headers: &HeaderMap) -> Option<OperatorSession> {
        let token = self.token(headers)?;
        self.sessions.lock().get(&token).cloned()
    }

    pub fn close(&self, headers: &HeaderMap) -> Option<OperatorSession> {
        let token = self.token(headers)?;
        self.sessions.lock().remove(&token)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn set_cookie(&self, token: &str) -> String {
        format!("{}={}; HttpOnly; Path=/; SameSite=Lax", self.cookie_name, token)
    }

    pub fn clear_cookie(&self) -> String {
        format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", self.cookie_name)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

fn with_cookie(mut resp: Response, cookie: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(cookie).map_err(|e| ApiError::internal("Login failed", e))?;
    resp.headers_mut().insert(SET_COOKIE, value);
    Ok(resp)
}

pub async fn login(
    State(app): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!("rejected login body: {e}");
        ApiError::bad_request("Invalid request body")
    })?;
    let (Some(host), Some(username), Some(password)) =
        (non_empty(req.host), non_empty(req.username), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Missing required parameters"));
    };

    let target = ConnectTarget::new(host.trim(), username.trim(), password)
        .with_port(req.port.unwrap_or(app.cfg.vsphere.default_port));
    if !app.sessions.connect(&target).await {
        return Err(ApiError::unauthorized("Invalid credentials or connection failed"));
    }

    let token = app.operators.open(&target.user, &target.host);
    info!("operator {} logged in on {}", target.user, target.host);
    let body = Json(json!({
        "status": "success",
        "user": { "username": target.user, "vsphere_host": target.host },
    }));
    with_cookie(body.into_response(), &app.operators.set_cookie(&token))
}

pub async fn logout(State(app): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(session) = app.operators.close(&headers) {
        info!("operator {} logged out", session.username);
    }
    let body = Json(json!({ "status": "success" }));
    with_cookie(body.into_response(), &app.operators.clear_cookie())
}

pub async fn session_info(State(app): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    let user = app.operators.resolve(&headers);
    Json(json!({
        "authenticated": user.is_some(),
        "user": user,
        "connection": app.sessions.status(),
    }))
}

/// Garde des routes /api/... quand `auth.require_session` est actif
pub async fn require_session(State(app): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if !app.cfg.auth.require_session || !path.starts_with("/api/") || path == "/api/session" {
        return next.run(req).await;
    }
    if app.operators.resolve(req.headers()).is_some() {
        next.run(req).await
    } else {
        ApiError::unauthorized("Authentication required").into_response()
    }
}
