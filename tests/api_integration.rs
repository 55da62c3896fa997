//! Integration tests for the HTTP API
//!
//! Tests session lifecycle endpoints through the router

use poselock::core::{create_router, create_router_with_retention};
use poselock::types::SessionSettings;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::time::Duration;
use tower::ServiceExt;
use serde_json::{json, Value};

fn create_test_router() -> Router {
    create_router(SessionSettings::default())
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn frame(sequence: u64, yaw: f64) -> Value {
    json!({
        "measurement": {
            "sequence": sequence,
            "timestamp_ms": sequence * 33,
            "face": {
                "bounds": {"x": 200.0, "y": 90.0, "width": 240.0, "height": 300.0},
                "angle": {"yaw": yaw, "pitch": 0.0}
            }
        }
    })
}

async fn create_left_session(app: &Router) -> String {
    let (status, json) = send(
        app,
        "POST",
        "/session/new",
        Some(json!({
            "settings": {
                "bearings": ["LEFT"],
                "max_bearings": 2,
                "fixed_duration_ms": 100,
                "seed": 1
            }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["sessions_active"], 0);
}

#[tokio::test]
async fn test_create_session() {
    let app = create_test_router();
    let (status, json) = send(&app, "POST", "/session/new", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["session_id"].is_string());
    assert!(json["websocket_url"].as_str().unwrap().starts_with("/ws/"));
    assert_eq!(json["requirement"]["bearing"], "STRAIGHT");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions_active"], 1);
}

#[tokio::test]
async fn test_create_session_without_body() {
    let app = create_test_router();
    let (status, json) = send(&app, "POST", "/session/new", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["requirement"]["step"], 0);
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let app = create_test_router();
    let (status, json) = send(
        &app,
        "POST",
        "/session/new",
        Some(json!({"settings": {"max_bearings": 0}})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("max_bearings"));
}

#[tokio::test]
async fn test_session_not_found() {
    let app = create_test_router();

    let (status, _) = send(&app, "GET", "/session/nonexistent", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/session/nonexistent/frame", Some(frame(0, 0.0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", "/session/nonexistent/result", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "POST", "/session/nonexistent/close", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_session_flow() {
    let app = create_test_router();
    let id = create_left_session(&app).await;

    let (status, _) = send(&app, "GET", &format!("/session/{}/result", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut sequence = 0;
    let mut yaw = 0.0;
    let mut state = Value::Null;
    for _ in 0..60 {
        let (status, step) = send(
            &app,
            "POST",
            &format!("/session/{}/frame", id),
            Some(frame(sequence, yaw)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        sequence += 1;
        if step["bearing"] == "LEFT" && yaw < 25.0 {
            yaw += 2.0;
        }
        state = step["state"].clone();
        if state == "COMPLETE" || state == "ABORTED" {
            break;
        }
    }
    assert_eq!(state, "COMPLETE");

    let (status, status_json) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_json["capture_count"], 2);
    assert!(status_json["alignment"].is_null());
    assert!(status_json["requirement"].is_null());

    let (status, result) = send(&app, "GET", &format!("/session/{}/result", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["passed"], true);
    assert_eq!(result["result"]["captures"].as_array().unwrap().len(), 2);
    assert_eq!(result["result"]["captures"][1]["bearing"], "LEFT");
}

#[tokio::test]
async fn test_close_session() {
    let app = create_test_router();
    let id = create_left_session(&app).await;

    let (status, json) = send(&app, "POST", &format!("/session/{}/close", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["closed"], true);
    assert_eq!(json["state"], "ABORTED");

    let (_, json) = send(&app, "POST", &format!("/session/{}/close", id), None).await;
    assert_eq!(json["closed"], false);

    let (status, result) = send(&app, "GET", &format!("/session/{}/result", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["passed"], false);
    assert_eq!(result["error"]["error"], "cancelled");

    let (_, step) = send(&app, "POST", &format!("/session/{}/frame", id), Some(frame(0, 0.0))).await;
    assert_eq!(step["reason"], "R006_SESSION_ENDED");
}

#[tokio::test]
async fn test_spoof_reported_through_status() {
    let app = create_test_router();
    let id = create_left_session(&app).await;

    send(&app, "POST", &format!("/session/{}/frame", id), Some(frame(0, 0.0))).await;
    let (_, step) = send(&app, "POST", &format!("/session/{}/frame", id), Some(frame(1, 40.0))).await;
    assert_eq!(step["state"], "ABORTED");

    let (_, status) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status["error"]["error"], "spoof_attempt");
    assert_eq!(status["error"]["detail"], "moved_too_fast");
}

#[tokio::test]
async fn test_deadline_runs_on_server_clock() {
    let app = create_test_router();
    let (_, json) = send(
        &app,
        "POST",
        "/session/new",
        Some(json!({"settings": {"bearings": ["LEFT"], "timeout_ms": 50}})),
    )
    .await;
    let id = json["session_id"].as_str().unwrap().to_string();

    // Client timestamps stay at zero, yet the session still expires
    tokio::time::sleep(Duration::from_millis(120)).await;
    let (status, json) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "ABORTED");
    assert_eq!(json["error"]["error"], "timeout");

    let (_, step) = send(&app, "POST", &format!("/session/{}/frame", id), Some(frame(0, 0.0))).await;
    assert_eq!(step["reason"], "R006_SESSION_ENDED");
}

#[tokio::test]
async fn test_finished_sessions_are_evicted() {
    let app = create_router_with_retention(SessionSettings::default(), Duration::ZERO);
    let (_, json) = send(&app, "POST", "/session/new", None).await;
    let id = json["session_id"].as_str().unwrap().to_string();
    let (_, running) = send(&app, "POST", "/session/new", None).await;
    let running = running["session_id"].as_str().unwrap().to_string();

    send(&app, "POST", &format!("/session/{}/close", id), None).await;
    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["sessions_active"], 1);

    let (status, _) = send(&app, "GET", &format!("/session/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "GET", &format!("/session/{}", running), None).await;
    assert_eq!(status, StatusCode::OK);
}
