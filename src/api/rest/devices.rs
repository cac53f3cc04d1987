//! Device listing and state endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

use crate::api::state::AppState;

/// GET /devices - `[{id, type, name}]` in listing order
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session().await {
        Ok(session) => Json(session.devices()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /state/:id - State map keyed by `functionClass[:instance]`
pub async fn device_state(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> impl IntoResponse {
    let session = match state.session().await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match session.device_state(&device_id).await {
        Ok(states) => Json(states).into_response(),
        Err(e) => e.into_response(),
    }
}
