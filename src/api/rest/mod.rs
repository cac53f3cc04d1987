//! REST endpoints of the command proxy
//!
//! - `POST /login` - Start a bridge session
//! - `GET /devices` - Devices of the session
//! - `POST /discover` - Refresh and report new devices
//! - `GET /discovery/status` - Drift since the last discovery
//! - `GET /state/:id` - State map of one device
//! - `POST /command/:id` - Dispatch a command

pub mod auth;
pub mod commands;
pub mod devices;
pub mod discovery;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use crate::bridge::BridgeError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }
}

impl BridgeError {
    /// HTTP status and error code reported for this error
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self {
            BridgeError::NotLoggedIn => (StatusCode::BAD_REQUEST, "NOT_LOGGED_IN"),
            BridgeError::DeviceNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            BridgeError::UnsupportedCommand(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_COMMAND"),
            BridgeError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            BridgeError::Auth(_)
            | BridgeError::Upstream(_)
            | BridgeError::Http(_)
            | BridgeError::Snapshot(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let (status, code) = self.status();
        if status.is_server_error() {
            warn!(error = %self, "upstream failure");
        }
        (status, Json(ApiError::new(code, self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BridgeError::NotLoggedIn.status(),
            (StatusCode::BAD_REQUEST, "NOT_LOGGED_IN")
        );
        assert_eq!(
            BridgeError::DeviceNotFound("x".into()).status(),
            (StatusCode::NOT_FOUND, "NOT_FOUND")
        );
        assert_eq!(
            BridgeError::UnsupportedCommand("x".into()).status().1,
            "UNSUPPORTED_COMMAND"
        );
        assert_eq!(
            BridgeError::Upstream("500".into()).status(),
            (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
        );
    }
}
