//! Axum router construction for the observer server.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete router: read API, health, and the `/ws` stream.
///
/// CORS allows any origin so a dashboard served from elsewhere can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status
        .route("/", get(handlers::index))
        .route("/api", get(handlers::api_index))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_live))
        // Vehicles
        .route("/api/vehicles", get(handlers::list_vehicles))
        .route("/api/vehicles/live", get(handlers::live_fleet))
        .route("/api/vehicles/{id}", get(handlers::get_vehicle))
        .route("/api/vehicles/{id}/history", get(handlers::vehicle_history))
        // Alerts
        .route("/api/alerts", get(handlers::active_alerts))
        .route("/api/alerts/vehicle/{id}", get(handlers::vehicle_alerts))
        .route(
            "/api/alerts/{id}/acknowledge",
            post(handlers::acknowledge_alert),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
