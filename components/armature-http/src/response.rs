//! Structured error responses.
//!
//! Any value that can report an HTTP status code renders as
//! `{status_code, message, log, error_key, additional?}`; everything else is
//! handled by the recovery boundary as a generic 500 pair.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Capability check: a value that can report an HTTP-style status code.
pub trait CanStatusCode {
    fn status_code(&self) -> u16;
}

/// Application-level error rendered to clients. `log` carries the internal
/// detail (for operators), `message` the client-facing text, `error_key` a
/// stable machine-readable key.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(rename = "status_code")]
    pub code: u16,
    pub message: String,
    pub log: String,
    #[serde(rename = "error_key")]
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional: Option<Map<String, Value>>,
}

impl ApiError {
    pub fn new(code: StatusCode, message: impl Into<String>, key: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code: code.as_u16(),
            log: message.clone(),
            message,
            key: key.into(),
            additional: None,
        }
    }

    pub fn with_log(mut self, log: impl Into<String>) -> Self {
        self.log = log.into();
        self
    }

    pub fn with_additional(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.additional
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    // --- catalog -------------------------------------------------------

    pub fn invalid_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid request", "ErrInvalidRequest")
            .with_log(detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation failed", "ErrValidation").with_log(detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized access",
            "ErrUnauthorized",
        )
        .with_log(detail)
    }

    pub fn invalid_token(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token",
            "ErrInvalidToken",
        )
        .with_log(detail)
    }

    pub fn no_permission(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "You don't have permission to perform this action",
            "ErrNoPermission",
        )
        .with_log(detail)
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{entity} not found"),
            "ErrNotFound",
        )
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "Resource conflict", "ErrConflict").with_log(detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong in the server",
            "ErrInternal",
        )
        .with_log(detail)
    }

    pub fn database(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Database error",
            "ErrDatabase",
        )
        .with_log(detail)
    }

    pub fn entity_not_found(entity: &str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{entity} not found"),
            format!("Err{entity}NotFound"),
        )
        .with_log(detail)
    }

    pub fn cannot_create_entity(entity: &str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Cannot create {entity}"),
            format!("ErrCannotCreate{entity}"),
        )
        .with_log(detail)
    }

    pub fn cannot_get_entity(entity: &str, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Cannot get {entity}"),
            format!("ErrCannotGet{entity}"),
        )
        .with_log(detail)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl CanStatusCode for ApiError {
    fn status_code(&self) -> u16 {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_the_wire_field_names() {
        let err = ApiError::unauthorized("missing bearer token");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status_code"], 401);
        assert_eq!(json["message"], "Unauthorized access");
        assert_eq!(json["log"], "missing bearer token");
        assert_eq!(json["error_key"], "ErrUnauthorized");
        assert!(json.get("additional").is_none());
    }

    #[test]
    fn additional_context_is_included_when_present() {
        let err = ApiError::not_found("User").with_additional("user_id", 42);
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["additional"]["user_id"], 42);
        assert_eq!(json["error_key"], "ErrNotFound");
    }

    #[test]
    fn into_response_uses_the_embedded_status() {
        let resp = ApiError::no_permission("role mismatch").into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn entity_errors_build_dynamic_keys() {
        let err = ApiError::cannot_create_entity("Order", "constraint violation");
        assert_eq!(err.key, "ErrCannotCreateOrder");
        assert_eq!(err.code, 400);
        assert_eq!(err.log, "constraint violation");
    }
}
