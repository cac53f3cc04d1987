//! Login endpoint

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use super::ApiError;
use crate::api::state::AppState;
use crate::bridge::{Credentials, DEFAULT_POLL_INTERVAL};

/// Body of `POST /login`
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Controller refresh period in seconds
    pub poll_interval: Option<u64>,
}

/// POST /login - Start a session, replacing any active one
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> impl IntoResponse {
    if body.username.is_empty() || body.password.is_empty() {
        let error = ApiError::bad_request("username and password are required");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    let poll_interval = body
        .poll_interval
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_POLL_INTERVAL);
    let credentials = Credentials::new(body.username, body.password);

    match state.login(credentials, poll_interval).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => e.into_response(),
    }
}
