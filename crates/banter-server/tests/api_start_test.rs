use axum::body::Body;
use axum::http::{Request, StatusCode};
use banter_server::{app, config::Config, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn state_with_livekit() -> Arc<AppState> {
    let mut config = Config::default();
    config.livekit.url = "http://localhost:7880".to_string();
    config.livekit.api_key = "devkey".to_string();
    config.livekit.api_secret = "secret".to_string();
    // Keep retries fast; these tests never reach a real model anyway.
    config.agent.retry_base_delay_ms = 10;
    Arc::new(AppState::from_config(&config))
}

fn start_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/start")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_with_livekit() {
    let app = app(state_with_livekit());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["livekit"], true);
}

#[tokio::test]
async fn health_reports_degraded_without_livekit() {
    let state = Arc::new(AppState::from_config(&Config::default()));
    let app = app(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["livekit"], false);
}

#[tokio::test]
async fn start_rejects_empty_fields() {
    let app = app(state_with_livekit());

    for field in ["room_name", "participant_name", "participant_identity"] {
        let mut body = json!({
            "room_name": "room-1",
            "participant_name": "Alice",
            "participant_identity": "alice",
        });
        body[field] = json!("   ");

        let response = app.clone().oneshot(start_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(
            json["error"].as_str().unwrap().contains(field),
            "error should name the offending field"
        );
    }
}

#[tokio::test]
async fn start_requires_livekit() {
    let state = Arc::new(AppState::from_config(&Config::default()));
    let app = app(state);

    let response = app
        .oneshot(start_request(json!({
            "room_name": "room-1",
            "participant_name": "Alice",
            "participant_identity": "alice",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn start_returns_token_and_spawns_pipeline() {
    let state = state_with_livekit();
    let app = app(Arc::clone(&state));

    let response = app
        .oneshot(start_request(json!({
            "room_name": "room-42",
            "participant_name": "Alice",
            "participant_identity": "alice",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(!json["token"].as_str().unwrap().is_empty());
    assert_eq!(json["livekit_url"], "http://localhost:7880");

    let agent = state.sessions.agent("room-42").expect("pipeline not running");
    assert!(agent.is_connected());
    assert_eq!(state.sessions.active_rooms(), 1);
}

#[tokio::test]
async fn repeated_start_reuses_the_running_pipeline() {
    let state = state_with_livekit();
    let app = app(Arc::clone(&state));

    let body = json!({
        "room_name": "room-7",
        "participant_name": "Alice",
        "participant_identity": "alice",
    });

    let first = app.clone().oneshot(start_request(body.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let agent_before = state.sessions.agent("room-7").unwrap();

    let second = app.oneshot(start_request(body)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let agent_after = state.sessions.agent("room-7").unwrap();

    assert!(Arc::ptr_eq(&agent_before, &agent_after));
    assert_eq!(state.sessions.active_rooms(), 1);
}

#[tokio::test]
async fn stop_tears_down_session_and_history() {
    let state = state_with_livekit();
    let app = app(Arc::clone(&state));

    let response = app
        .oneshot(start_request(json!({
            "room_name": "room-9",
            "participant_name": "Alice",
            "participant_identity": "alice",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let agent = state.sessions.agent("room-9").unwrap();
    state
        .history
        .append("room-9", banter_agent::HistoryRole::User, "hello");

    state.sessions.stop("room-9", &state.history);

    assert!(state.sessions.agent("room-9").is_none());
    assert!(!agent.is_connected());
    assert!(state.history.get("room-9").is_empty());
}
