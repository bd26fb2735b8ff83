//! Recovery boundary.
//!
//! Expected failures travel the normal `Result<_, ApiError>` path out of
//! handlers. This boundary only handles the unexpected: a panic escaping a
//! handler is always logged with its raw payload; a payload carrying the
//! status-code capability (an [`ApiError`]) is rendered as itself, anything
//! else as a fixed generic 500 pair. In debug mode the panic is re-raised
//! after logging so failures stay visible during development.

use std::panic::AssertUnwindSafe;

use armature::ScopedLogger;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use serde_json::json;

use crate::response::ApiError;

#[derive(Clone)]
pub struct Recovery {
    logger: ScopedLogger,
    debug: bool,
}

impl Recovery {
    pub fn new(logger: ScopedLogger, debug: bool) -> Self {
        Self { logger, debug }
    }
}

pub async fn handle(State(state): State<Recovery>, req: Request, next: Next) -> Response {
    match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(payload) => {
            state
                .logger
                .with("panic", describe_payload(payload.as_ref()))
                .error("request handler panicked");

            if state.debug {
                // Delegate to the host's own top-level supervision.
                std::panic::resume_unwind(payload);
            }

            match payload.downcast::<ApiError>() {
                Ok(err) => (*err).into_response(),
                Err(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({
                        "code": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                        "message": "something went wrong",
                    })),
                )
                    .into_response(),
            }
        }
    }
}

fn describe_payload(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(err) = payload.downcast_ref::<ApiError>() {
        format!("{} ({})", err.log, err.key)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "opaque panic payload".to_string()
    }
}
