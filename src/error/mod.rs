//! Error types for composition and session access.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the stage coordinator.
///
/// Runtime authentication failures are never errors — they surface as
/// redirects. The only errors are setup mistakes and session-store faults.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("at least one authentication strategy is required")]
    NoStrategies,

    #[error("compose must run before this middleware is installed")]
    NotComposed,

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for StageError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.to_string() }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub type StageResult<T> = Result<T, StageError>;
