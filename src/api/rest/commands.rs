//! Command endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiError;
use crate::api::state::AppState;

/// Body of `POST /command/:id`
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub args: Value,
}

/// POST /command/:id - Route a command to the first controller exposing it
pub async fn send_command(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(body): Json<CommandRequest>,
) -> impl IntoResponse {
    let session = match state.session().await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    if body.cmd.trim().is_empty() {
        let error = ApiError::bad_request("Field 'cmd' is required");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    }

    match session.dispatch(&device_id, &body.cmd, &body.args).await {
        Ok(outcome) => Json(json!({
            "ok": true,
            "controller": outcome.controller,
            "values": outcome.values,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
