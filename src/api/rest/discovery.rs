//! Discovery endpoints

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::api::state::AppState;

/// POST /discover - Refresh, report new devices and move the baseline
pub async fn discover(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let session = match state.session().await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    match session.discover().await {
        Ok(discovery) => Json(discovery).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /discovery/status - Added and removed ids since the baseline
pub async fn discovery_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session().await {
        Ok(session) => Json(session.discovery_status()).into_response(),
        Err(e) => e.into_response(),
    }
}
