//! REST API endpoint handlers for the observer server.
//!
//! Roster and live fleet reads go through the cache first and fall back to
//! the persistence store; every cache failure is treated as a miss.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain status text |
//! | `GET` | `/api` | Endpoint index |
//! | `GET` | `/health` | Store reachability and vehicle count |
//! | `GET` | `/api/vehicles` | Roster |
//! | `GET` | `/api/vehicles/live` | Latest fleet state |
//! | `GET` | `/api/vehicles/{id}` | One vehicle |
//! | `GET` | `/api/vehicles/{id}/history` | Telemetry within the last `hours` |
//! | `GET` | `/api/alerts` | Unacknowledged alerts |
//! | `GET` | `/api/alerts/vehicle/{id}` | Alerts for one vehicle |
//! | `POST` | `/api/alerts/{id}/acknowledge` | Acknowledge an alert |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{TimeDelta, Utc};
use fleet_core::cache::{LIVE_FLEET_KEY, ROSTER_KEY};
use fleet_types::{AlertId, AlertRecord, TelemetrySnapshot, VehicleId, VehicleRecord, VehicleState};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ObserverError;
use crate::state::AppState;

/// Default telemetry history window, in hours.
pub const DEFAULT_HISTORY_HOURS: i64 = 24;

/// Longest telemetry history window accepted, in hours (30 days).
pub const MAX_HISTORY_HOURS: i64 = 720;

/// Endpoints listed by `GET /api`.
const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/vehicles",
    "GET /api/vehicles/live",
    "GET /api/vehicles/{id}",
    "GET /api/vehicles/{id}/history?hours=N",
    "GET /api/alerts",
    "GET /api/alerts/vehicle/{id}",
    "POST /api/alerts/{id}/acknowledge",
    "GET /ws",
];

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/vehicles/{id}/history` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    /// Window length in hours. Taken as text so a malformed value gets the
    /// same JSON error body as an out-of-range one.
    pub hours: Option<String>,
}

impl HistoryQuery {
    /// The requested window in hours, validated against
    /// `1..=MAX_HISTORY_HOURS`.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverError::InvalidQuery`] for a non-integer or
    /// out-of-range value.
    pub fn hours(&self) -> Result<i64, ObserverError> {
        let Some(raw) = self.hours.as_deref() else {
            return Ok(DEFAULT_HISTORY_HOURS);
        };
        let hours: i64 = raw.trim().parse().map_err(|e| {
            ObserverError::InvalidQuery(format!("hours must be an integer, got {raw:?}: {e}"))
        })?;
        if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
            return Err(ObserverError::InvalidQuery(format!(
                "hours must be between 1 and {MAX_HISTORY_HOURS}, got {hours}"
            )));
        }
        Ok(hours)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// `GET /` -- plain status text.
pub async fn index() -> &'static str {
    "Fleet telemetry simulator running"
}

/// `GET /api` -- endpoint index.
pub async fn api_index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Fleet telemetry API",
        "endpoints": ENDPOINTS,
    }))
}

/// `GET /health` -- count vehicles in the store.
///
/// Answers 503 with an `unhealthy` body when the store cannot be queried.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let timestamp = Utc::now();
    match state.repository.count_vehicles().await {
        Ok(count) => Json(serde_json::json!({
            "status": "healthy",
            "database": "connected",
            "vehicle_count": count,
            "timestamp": timestamp,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "database": "error",
                    "error": e.to_string(),
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Vehicles
// ---------------------------------------------------------------------------

/// `GET /api/vehicles` -- the roster, served from cache when fresh.
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VehicleRecord>>, ObserverError> {
    if let Some(cached) = cached::<Vec<VehicleRecord>>(&state, ROSTER_KEY).await {
        return Ok(Json(cached));
    }

    let vehicles = state.repository.list_vehicles().await?;

    let json = serde_json::to_string(&vehicles)?;
    if let Err(e) = state.cache.set(ROSTER_KEY, &json, state.roster_ttl).await {
        tracing::warn!(key = ROSTER_KEY, error = %e, "Cache write failed");
    }

    Ok(Json(vehicles))
}

/// `GET /api/vehicles/live` -- the latest state of the whole fleet.
///
/// Served from the slow-tick cache entry; falls back to the newest stored
/// snapshot per vehicle.
pub async fn live_fleet(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VehicleState>>, ObserverError> {
    Ok(Json(current_fleet(&state).await?))
}

/// `GET /api/vehicles/{id}` -- one roster entry.
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VehicleRecord>, ObserverError> {
    let id = VehicleId::new(id);
    let vehicle = state
        .repository
        .get_vehicle(&id)
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("vehicle {id}")))?;
    Ok(Json(vehicle))
}

/// `GET /api/vehicles/{id}/history?hours=N` -- telemetry recorded within
/// the last `N` hours, oldest first.
pub async fn vehicle_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<TelemetrySnapshot>>, ObserverError> {
    let hours = query.hours()?;
    let since = TimeDelta::try_hours(hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| ObserverError::InvalidQuery(format!("hours out of range: {hours}")))?;

    let history = state
        .repository
        .telemetry_history(&VehicleId::new(id), since)
        .await?;
    Ok(Json(history))
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// `GET /api/alerts` -- unacknowledged alerts, newest first.
pub async fn active_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AlertRecord>>, ObserverError> {
    Ok(Json(state.repository.active_alerts().await?))
}

/// `GET /api/alerts/vehicle/{id}` -- every alert for one vehicle, newest
/// first.
pub async fn vehicle_alerts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<AlertRecord>>, ObserverError> {
    Ok(Json(
        state.repository.vehicle_alerts(&VehicleId::new(id)).await?,
    ))
}

/// `POST /api/alerts/{id}/acknowledge` -- mark an alert acknowledged.
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AlertRecord>, ObserverError> {
    let id = parse_alert_id(&id)?;
    let alert = state
        .repository
        .acknowledge_alert(id)
        .await?
        .ok_or_else(|| ObserverError::NotFound(format!("alert {id}")))?;
    tracing::info!(alert_id = %id, vehicle_id = %alert.event.vehicle_id, "Alert acknowledged");
    Ok(Json(alert))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read and decode a cached JSON value. Unreachable caches and undecodable
/// entries are misses.
async fn cached<T: DeserializeOwned>(state: &AppState, key: &str) -> Option<T> {
    let raw = match state.cache.get(key).await {
        Ok(raw) => raw?,
        Err(e) => {
            tracing::warn!(key, error = %e, "Cache read failed, falling back to store");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding undecodable cache entry");
            None
        }
    }
}

/// The latest fleet state: the slow-tick cache entry if present, else the
/// newest stored snapshot per vehicle.
pub(crate) async fn current_fleet(state: &AppState) -> Result<Vec<VehicleState>, ObserverError> {
    if let Some(fleet) = cached::<Vec<VehicleState>>(state, LIVE_FLEET_KEY).await {
        return Ok(fleet);
    }
    let latest = state.repository.latest_telemetry().await?;
    Ok(latest.into_iter().map(|s| s.state).collect())
}

fn parse_alert_id(s: &str) -> Result<AlertId, ObserverError> {
    Uuid::parse_str(s)
        .map(AlertId::from)
        .map_err(|e| ObserverError::InvalidUuid(format!("{s}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(hours: Option<&str>) -> HistoryQuery {
        HistoryQuery {
            hours: hours.map(str::to_owned),
        }
    }

    #[test]
    fn history_hours_default_and_bounds() {
        assert_eq!(query(None).hours().unwrap(), DEFAULT_HISTORY_HOURS);
        assert_eq!(query(Some("1")).hours().unwrap(), 1);
        assert_eq!(query(Some("720")).hours().unwrap(), 720);
        assert!(query(Some("0")).hours().is_err());
        assert!(query(Some("721")).hours().is_err());
        assert!(query(Some("-3")).hours().is_err());
        assert!(query(Some("two")).hours().is_err());
    }

    #[test]
    fn alert_id_must_be_a_uuid() {
        assert!(parse_alert_id("not-a-uuid").is_err());
        let id = AlertId::new();
        assert_eq!(parse_alert_id(&id.to_string()).unwrap(), id);
    }
}
