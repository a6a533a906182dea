//! Integration tests for the read API.
//!
//! Most tests drive the Axum `Router` directly via `tower::ServiceExt`
//! against the in-memory repository and cache. The `/ws` tests serve the
//! router on a loopback port and connect a real `WebSocket` client.

#![allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects,
    clippy::panic
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{TimeDelta, Utc};
use fleet_core::cache::{FleetCache, LIVE_FLEET_KEY, ROSTER_KEY};
use fleet_core::channel::LiveChannel;
use fleet_core::memory::{InMemoryCache, InMemoryRepository};
use fleet_core::repository::FleetRepository;
use fleet_observer::router::build_router;
use fleet_observer::state::AppState;
use fleet_types::{
    AlertCategory, AlertEvent, LiveEvent, LiveTopic, Severity, TelemetrySnapshot, VehicleId,
    VehicleState,
};
use futures::{Stream, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite};
use tower::ServiceExt;

struct Fixture {
    repo: Arc<InMemoryRepository>,
    cache: Arc<InMemoryCache>,
    state: Arc<AppState>,
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryRepository::with_demo_fleet());
    let cache = Arc::new(InMemoryCache::new());
    let state = Arc::new(AppState::new(
        Arc::clone(&repo) as Arc<dyn FleetRepository>,
        Arc::clone(&cache) as Arc<dyn FleetCache>,
    ));
    Fixture { repo, cache, state }
}

async fn send(state: &Arc<AppState>, method: Method, uri: &str) -> (StatusCode, Value) {
    let app = build_router(Arc::clone(state));
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn get(state: &Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    send(state, Method::GET, uri).await
}

fn alert(vehicle: &str, category: AlertCategory, minutes_ago: i64) -> AlertEvent {
    AlertEvent {
        vehicle_id: VehicleId::new(vehicle),
        category,
        message: format!("{} on {vehicle}", category.label()),
        severity: Severity::WARNING,
        created_at: Utc::now() - TimeDelta::minutes(minutes_ago),
    }
}

// =============================================================================
// Status
// =============================================================================

#[tokio::test]
async fn index_returns_plain_text() {
    let f = fixture();
    let app = build_router(Arc::clone(&f.state));
    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert!(String::from_utf8(bytes.to_vec()).unwrap().contains("running"));
}

#[tokio::test]
async fn api_index_lists_endpoints() {
    let f = fixture();
    let (status, json) = get(&f.state, "/api").await;
    assert_eq!(status, StatusCode::OK);
    let endpoints = json["endpoints"].as_array().unwrap();
    assert!(endpoints.iter().any(|e| e == "GET /health"));
    assert!(endpoints.iter().any(|e| e == "POST /api/alerts/{id}/acknowledge"));
}

#[tokio::test]
async fn health_reports_vehicle_count() {
    let f = fixture();
    let (status, json) = get(&f.state, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["vehicle_count"], 5);
}

#[tokio::test]
async fn health_is_503_when_store_is_down() {
    let f = fixture();
    f.repo.set_unavailable(true);
    let (status, json) = get(&f.state, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "unhealthy");
    assert!(json["error"].is_string());
}

// =============================================================================
// Vehicles
// =============================================================================

#[tokio::test]
async fn roster_is_ordered_and_cached() {
    let f = fixture();

    let (status, json) = get(&f.state, "/api/vehicles").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["vehicle_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["VH-001", "VH-002", "VH-003", "VH-004", "VH-005"]);
    assert_eq!(f.repo.list_calls(), 1);
    assert!(f.cache.peek(ROSTER_KEY).is_some());

    let (_, again) = get(&f.state, "/api/vehicles").await;
    assert_eq!(again, json);
    assert_eq!(f.repo.list_calls(), 1);
}

#[tokio::test]
async fn roster_falls_back_to_store_when_cache_is_down() {
    let f = fixture();
    f.cache.set_unavailable(true);

    let (status, json) = get(&f.state, "/api/vehicles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 5);
    assert_eq!(f.repo.list_calls(), 1);
}

#[tokio::test]
async fn undecodable_cache_entry_is_a_miss() {
    let f = fixture();
    f.cache
        .set(ROSTER_KEY, "not json", Duration::from_secs(30))
        .await
        .unwrap();

    let (status, json) = get(&f.state, "/api/vehicles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 5);
    assert_eq!(f.repo.list_calls(), 1);
}

#[tokio::test]
async fn live_fleet_prefers_cache() {
    let f = fixture();
    let fleet = vec![VehicleState::parked(
        VehicleId::new("VH-009"),
        37.77,
        -122.42,
        10.0,
    )];
    f.cache
        .set(
            LIVE_FLEET_KEY,
            &serde_json::to_string(&fleet).unwrap(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let (status, json) = get(&f.state, "/api/vehicles/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json[0]["vehicle_id"], "VH-009");
}

#[tokio::test]
async fn live_fleet_falls_back_to_latest_telemetry() {
    let f = fixture();
    let now = Utc::now();
    let mut state = VehicleState::parked(VehicleId::new("VH-001"), 37.77, -122.42, 100.0);
    f.repo
        .insert_telemetry(&TelemetrySnapshot::capture(&state, now - TimeDelta::seconds(20)))
        .await
        .unwrap();
    state.speed = 42.0;
    f.repo
        .insert_telemetry(&TelemetrySnapshot::capture(&state, now))
        .await
        .unwrap();

    let (status, json) = get(&f.state, "/api/vehicles/live").await;
    assert_eq!(status, StatusCode::OK);
    let fleet = json.as_array().unwrap();
    assert_eq!(fleet.len(), 1);
    assert_eq!(fleet[0]["speed"], 42.0);
}

#[tokio::test]
async fn get_vehicle_and_404() {
    let f = fixture();

    let (status, json) = get(&f.state, "/api/vehicles/VH-002").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["make"], "Waymo");
    assert_eq!(json["status"], "autonomous");

    let (status, json) = get(&f.state, "/api/vehicles/VH-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn history_window_defaults_to_a_day() {
    let f = fixture();
    let now = Utc::now();
    let state = VehicleState::parked(VehicleId::new("VH-003"), 37.77, -122.42, 100.0);
    for hours_ago in [48, 12, 1] {
        f.repo
            .insert_telemetry(&TelemetrySnapshot::capture(
                &state,
                now - TimeDelta::hours(hours_ago),
            ))
            .await
            .unwrap();
    }

    let (status, json) = get(&f.state, "/api/vehicles/VH-003/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = get(&f.state, "/api/vehicles/VH-003/history?hours=2").await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (_, json) = get(&f.state, "/api/vehicles/VH-003/history?hours=72").await;
    let history = json.as_array().unwrap();
    assert_eq!(history.len(), 3);
    let first = history[0]["recorded_at"].as_str().unwrap();
    let last = history[2]["recorded_at"].as_str().unwrap();
    assert!(first < last);
}

#[tokio::test]
async fn history_rejects_bad_hours() {
    let f = fixture();
    for query in ["hours=0", "hours=721", "hours=abc"] {
        let (status, json) = get(&f.state, &format!("/api/vehicles/VH-001/history?{query}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(json["status"], 400);
    }
}

// =============================================================================
// Alerts
// =============================================================================

#[tokio::test]
async fn active_alerts_are_newest_first_and_acknowledge_removes() {
    let f = fixture();
    let old = f
        .repo
        .insert_alert(&alert("VH-001", AlertCategory::LowFuel, 10))
        .await
        .unwrap();
    let new = f
        .repo
        .insert_alert(&alert("VH-002", AlertCategory::HighTemperature, 1))
        .await
        .unwrap();

    let (status, json) = get(&f.state, "/api/alerts").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [new.to_string(), old.to_string()]);

    let (status, json) = send(
        &f.state,
        Method::POST,
        &format!("/api/alerts/{new}/acknowledge"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["acknowledged"], true);
    assert_eq!(json["category"], "high_temperature");

    let (_, json) = get(&f.state, "/api/alerts").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], old.to_string());
}

#[tokio::test]
async fn vehicle_alerts_include_acknowledged() {
    let f = fixture();
    let id = f
        .repo
        .insert_alert(&alert("VH-004", AlertCategory::LowFuel, 5))
        .await
        .unwrap();
    f.repo
        .insert_alert(&alert("VH-005", AlertCategory::LowFuel, 5))
        .await
        .unwrap();
    f.repo.acknowledge_alert(id).await.unwrap();

    let (status, json) = get(&f.state, "/api/alerts/vehicle/VH-004").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = json.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["acknowledged"], true);
}

#[tokio::test]
async fn acknowledge_unknown_or_malformed_id() {
    let f = fixture();

    let (status, _) = send(
        &f.state,
        Method::POST,
        &format!("/api/alerts/{}/acknowledge", uuid::Uuid::now_v7()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send(&f.state, Method::POST, "/api/alerts/nope/acknowledge").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn store_outage_is_503_on_reads() {
    let f = fixture();
    f.repo.set_unavailable(true);
    let (status, json) = get(&f.state, "/api/alerts").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], 503);
}

// =============================================================================
// Live channel
// =============================================================================

#[tokio::test]
async fn app_state_relays_published_events() {
    let f = fixture();
    let mut rx = f.state.subscribe();

    let delivered = f.state.publish(LiveEvent::Alert(alert(
        "VH-001",
        AlertCategory::HighTemperature,
        0,
    )));
    assert_eq!(delivered, 1);

    let event = rx.recv().await.unwrap();
    assert_eq!(event.topic(), LiveTopic::Alert);
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["topic"], "alert");
    assert_eq!(json["payload"]["vehicle_id"], "VH-001");
}

async fn serve(state: &Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::clone(state));
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

async fn next_event<S>(ws: &mut S) -> LiveEvent
where
    S: Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        if let tungstenite::Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_for_subscribers(state: &AppState, n: usize) {
    for _ in 0..100 {
        if state.subscriber_count() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no live client subscribed");
}

#[tokio::test]
async fn ws_client_gets_current_fleet_then_live_events() {
    let f = fixture();
    let fleet = vec![VehicleState::parked(
        VehicleId::new("VH-009"),
        37.77,
        -122.42,
        10.0,
    )];
    f.cache
        .set(
            LIVE_FLEET_KEY,
            &serde_json::to_string(&fleet).unwrap(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    let addr = serve(&f.state).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();

    match next_event(&mut ws).await {
        LiveEvent::Telemetry(current) => assert_eq!(current, fleet),
        other => panic!("expected current fleet first, got {other:?}"),
    }

    let raised = alert("VH-009", AlertCategory::LowFuel, 0);
    assert_eq!(f.state.publish(LiveEvent::Alert(raised.clone())), 1);
    assert_eq!(next_event(&mut ws).await, LiveEvent::Alert(raised));
}

#[tokio::test]
async fn ws_topic_filter_skips_other_topics() {
    let f = fixture();
    let addr = serve(&f.state).await;

    let (mut ws, _) = connect_async(format!("ws://{addr}/ws?topics=alert"))
        .await
        .unwrap();
    wait_for_subscribers(&f.state, 1).await;

    f.state.publish(LiveEvent::Telemetry(Vec::new()));
    let raised = alert("VH-001", AlertCategory::HighTemperature, 0);
    f.state.publish(LiveEvent::Alert(raised.clone()));

    assert_eq!(next_event(&mut ws).await, LiveEvent::Alert(raised));
}

#[tokio::test]
async fn ws_rejects_unknown_topic() {
    let f = fixture();
    let addr = serve(&f.state).await;
    assert!(connect_async(format!("ws://{addr}/ws?topics=weather")).await.is_err());
}
