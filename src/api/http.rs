//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::rest::{auth, commands, devices, discovery};
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // the hub calls from the LAN without a fixed origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(auth::login))
        .route("/devices", get(devices::list_devices))
        .route("/state/:id", get(devices::device_state))
        .route("/discover", post(discovery::discover))
        .route("/discovery/status", get(discovery::discovery_status))
        .route("/command/:id", post(commands::send_command))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    uptime_secs: i64,
    session_active: bool,
    version: &'static str,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        session_active: state.has_session().await,
        version: crate::VERSION,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::BridgeBackend;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState::new(BridgeBackend::Snapshot(
            "/nonexistent.json".into(),
        )));
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["session_active"], false);
        assert_eq!(health["version"], crate::VERSION);
    }

    #[tokio::test]
    async fn test_session_routes_require_login() {
        for (method, uri) in [
            ("GET", "/devices"),
            ("GET", "/state/abc"),
            ("POST", "/discover"),
            ("GET", "/discovery/status"),
        ] {
            let response = app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);

            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(error["code"], "NOT_LOGGED_IN");
        }
    }
}
