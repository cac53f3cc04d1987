//! Router tests against the snapshot bridge

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

use hubspace_bridge::{create_router, AppState, BridgeBackend};

fn records(extra: bool) -> Value {
    let mut devices = vec![
        json!({
            "typeId": "metadevice.device",
            "id": "light-1",
            "description": {"device": {"deviceClass": "light", "friendlyName": "Porch"}},
            "state": {"values": [
                {"functionClass": "power", "value": "off"},
                {"functionClass": "brightness", "value": 20}
            ]}
        }),
        json!({
            "typeId": "metadevice.device",
            "id": "fan-1",
            "description": {"device": {"deviceClass": "ceiling-fan", "friendlyName": "Bedroom Fan"}},
            "state": [
                {"functionClass": "fan-speed", "functionInstance": "fan-speed", "value": "fan-speed-6-033"}
            ]
        }),
        json!({"typeId": "metadevice.home", "id": "home-1"}),
    ];
    if extra {
        devices.push(json!({
            "typeId": "metadevice.device",
            "id": "lock-1",
            "description": {"device": {"deviceClass": "door-lock", "friendlyName": "Front"}},
            "state": []
        }));
    }
    Value::Array(devices)
}

fn setup() -> (TempDir, PathBuf, Router) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metadevices.json");
    fs::write(&path, records(false).to_string()).unwrap();
    let state = Arc::new(AppState::new(BridgeBackend::Snapshot(path.clone())));
    (dir, path, create_router(state))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) {
    let (status, body) = call(
        app,
        "POST",
        "/login",
        Some(json!({"username": "me@example.com", "password": "secret"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let (_dir, _path, app) = setup();

    let (status, body) = call(&app, "POST", "/login", Some(json!({"username": "me"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (_, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(health["session_active"], false);
}

#[tokio::test]
async fn test_command_without_session() {
    let (_dir, _path, app) = setup();

    let (status, body) = call(
        &app,
        "POST",
        "/command/light-1",
        Some(json!({"cmd": "turn_on", "args": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "NOT_LOGGED_IN");
}

#[tokio::test]
async fn test_devices_and_state() {
    let (_dir, _path, app) = setup();
    login(&app).await;

    let (status, devices) = call(&app, "GET", "/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        devices,
        json!([
            {"id": "light-1", "type": "light", "name": "Porch"},
            {"id": "fan-1", "type": "ceiling-fan", "name": "Bedroom Fan"}
        ])
    );

    let (status, state) = call(&app, "GET", "/state/fan-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state, json!({"fan-speed:fan-speed": "fan-speed-6-033"}));

    let (status, body) = call(&app, "GET", "/state/home-1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, health) = call(&app, "GET", "/health", None).await;
    assert_eq!(health["session_active"], true);
}

#[tokio::test]
async fn test_command_updates_state() {
    let (_dir, _path, app) = setup();
    login(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/command/light-1",
        Some(json!({"cmd": "set_brightness", "args": {"brightness": 75}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["controller"], "lights");
    assert_eq!(
        body["values"],
        json!([{"functionClass": "brightness", "functionInstance": null, "value": 75}])
    );

    let (_, state) = call(&app, "GET", "/state/light-1", None).await;
    assert_eq!(state["brightness"], 75);
    assert_eq!(state["power"], "off");
}

#[tokio::test]
async fn test_command_uses_device_controller() {
    let (_dir, path, app) = setup();
    fs::write(&path, records(true).to_string()).unwrap();
    login(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/command/fan-1",
        Some(json!({"cmd": "turn_on", "args": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["controller"], "fans");

    // locks do not expose power control
    let (status, body) = call(
        &app,
        "POST",
        "/command/lock-1",
        Some(json!({"cmd": "turn_on", "args": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_COMMAND");
}

#[tokio::test]
async fn test_command_errors() {
    let (_dir, _path, app) = setup();
    login(&app).await;

    let (status, body) = call(
        &app,
        "POST",
        "/command/light-1",
        Some(json!({"cmd": "levitate", "args": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNSUPPORTED_COMMAND");

    let (status, body) = call(
        &app,
        "POST",
        "/command/light-1",
        Some(json!({"cmd": "set_brightness", "args": {"brightness": 500}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, body) = call(
        &app,
        "POST",
        "/command/ghost",
        Some(json!({"cmd": "turn_off"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_discovery_tracks_new_devices() {
    let (_dir, path, app) = setup();
    login(&app).await;

    let (_, status) = call(&app, "GET", "/discovery/status", None).await;
    assert_eq!(
        status,
        json!({"added": [], "removed": [], "baseline": 2, "current": 2})
    );

    fs::write(&path, records(true).to_string()).unwrap();

    let (status, discovery) = call(&app, "POST", "/discover", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(discovery["total"], 3);
    assert_eq!(
        discovery["new_devices"],
        json!([{"id": "lock-1", "type": "door-lock", "name": "Front"}])
    );

    let (_, status) = call(&app, "GET", "/discovery/status", None).await;
    assert_eq!(status["added"], json!([]));
    assert_eq!(status["current"], 3);
}
