//! Handlers HTTP : validation des entrées, délégation au `ManagementClient`,
//! mise en forme JSON.

pub mod host;
pub mod vm;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::error;

/// Réponse d'erreur `{"error": message}`
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// 500 générique : le détail part dans les logs, jamais dans la réponse
    pub fn internal(message: impl Into<String>, detail: impl Display) -> Self {
        let message = message.into();
        error!("{message}: {detail}");
        Self::failed(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub type ApiResult = Result<Json<Value>, ApiError>;

/// Sérialise la réponse ; un échec devient un 500 `failure`
pub fn respond<T: Serialize>(body: &T, failure: &str) -> ApiResult {
    serde_json::to_value(body).map(Json).map_err(|e| ApiError::internal(failure, e))
}

/// Paramètre présent et non vide
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_error_body() {
        let resp = ApiError::not_found("VM not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, json!({"error": "VM not found"}));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("web-01".into())), Some("web-01".into()));
        assert_eq!(non_empty(Some("  ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
