//! `PostgreSQL` implementation of [`FleetRepository`].
//!
//! One table per concern:
//!
//! | Table | Written by | Read by |
//! |-------|------------|---------|
//! | `vehicles` | seed migration | seeding, roster endpoints, health |
//! | `telemetry` | slow tick | history and live endpoints |
//! | `alerts` | slow tick, acknowledge | alert endpoints |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_core::repository::{FleetRepository, RepositoryError};
use fleet_types::{
    AlertEvent, AlertId, AlertRecord, Severity, TelemetrySnapshot, VehicleId, VehicleRecord,
    VehicleState,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

const TELEMETRY_COLUMNS: &str = "vehicle_id, latitude, longitude, heading, speed, fuel_level, \
     engine_temp, battery_voltage, odometer, lidar_active, radar_objects, camera_status, \
     emergency_braking, recorded_at";

const ALERT_COLUMNS: &str = "id, vehicle_id, category, message, severity, acknowledged, created_at";

/// Fleet persistence over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgFleetRepository {
    pool: PgPool,
}

impl PgFleetRepository {
    /// Wrap an existing pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_alerts(
        &self,
        filter: &str,
        vehicle: Option<&VehicleId>,
    ) -> Result<Vec<AlertRecord>, DbError> {
        let sql = format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE {filter} ORDER BY created_at DESC");
        let mut query = sqlx::query_as::<_, AlertRow>(&sql);
        if let Some(id) = vehicle {
            query = query.bind(id.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(AlertRecord::try_from).collect()
    }
}

#[async_trait]
impl FleetRepository for PgFleetRepository {
    async fn list_vehicles(&self) -> Result<Vec<VehicleRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, VehicleRow>(
            r"SELECT vehicle_id, make, model, status, odometer
              FROM vehicles
              ORDER BY vehicle_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(VehicleRecord::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn insert_telemetry(&self, snapshot: &TelemetrySnapshot) -> Result<(), RepositoryError> {
        let s = &snapshot.state;
        let sql = format!(
            "INSERT INTO telemetry ({TELEMETRY_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        sqlx::query(&sql)
            .bind(s.vehicle_id.as_str())
            .bind(s.latitude)
            .bind(s.longitude)
            .bind(s.heading)
            .bind(s.speed)
            .bind(s.fuel_level)
            .bind(s.engine_temp)
            .bind(s.battery_voltage)
            .bind(s.odometer)
            .bind(s.lidar_active)
            .bind(i32::try_from(s.radar_objects).unwrap_or(i32::MAX))
            .bind(s.camera_status.as_str())
            .bind(s.emergency_braking)
            .bind(snapshot.recorded_at)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

        tracing::trace!(vehicle_id = %s.vehicle_id, "Inserted telemetry");
        Ok(())
    }

    async fn insert_alert(&self, alert: &AlertEvent) -> Result<AlertId, RepositoryError> {
        let id = AlertId::new();
        sqlx::query(
            r"INSERT INTO alerts (id, vehicle_id, category, message, severity, acknowledged, created_at)
              VALUES ($1, $2, $3, $4, $5, FALSE, $6)",
        )
        .bind(id.into_inner())
        .bind(alert.vehicle_id.as_str())
        .bind(alert.category.as_str())
        .bind(alert.message.as_str())
        .bind(i16::from(alert.severity.level()))
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from)?;

        tracing::debug!(
            alert_id = %id,
            vehicle_id = %alert.vehicle_id,
            category = alert.category.as_str(),
            "Inserted alert"
        );
        Ok(id)
    }

    async fn get_vehicle(&self, id: &VehicleId) -> Result<Option<VehicleRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, VehicleRow>(
            r"SELECT vehicle_id, make, model, status, odometer
              FROM vehicles
              WHERE vehicle_id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?;

        Ok(row.map(VehicleRecord::try_from).transpose()?)
    }

    async fn telemetry_history(
        &self,
        id: &VehicleId,
        since: DateTime<Utc>,
    ) -> Result<Vec<TelemetrySnapshot>, RepositoryError> {
        let sql = format!(
            "SELECT {TELEMETRY_COLUMNS} FROM telemetry
             WHERE vehicle_id = $1 AND recorded_at >= $2
             ORDER BY recorded_at ASC"
        );
        let rows = sqlx::query_as::<_, TelemetryRow>(&sql)
            .bind(id.as_str())
            .bind(since)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(TelemetrySnapshot::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn latest_telemetry(&self) -> Result<Vec<TelemetrySnapshot>, RepositoryError> {
        let sql = format!(
            "SELECT DISTINCT ON (vehicle_id) {TELEMETRY_COLUMNS} FROM telemetry
             ORDER BY vehicle_id, recorded_at DESC"
        );
        let rows = sqlx::query_as::<_, TelemetryRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(TelemetrySnapshot::try_from)
            .collect::<Result<_, _>>()?)
    }

    async fn active_alerts(&self) -> Result<Vec<AlertRecord>, RepositoryError> {
        Ok(self.fetch_alerts("acknowledged = FALSE", None).await?)
    }

    async fn vehicle_alerts(&self, id: &VehicleId) -> Result<Vec<AlertRecord>, RepositoryError> {
        Ok(self.fetch_alerts("vehicle_id = $1", Some(id)).await?)
    }

    async fn acknowledge_alert(&self, id: AlertId) -> Result<Option<AlertRecord>, RepositoryError> {
        let sql = format!("UPDATE alerts SET acknowledged = TRUE WHERE id = $1 RETURNING {ALERT_COLUMNS}");
        let row = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(row.map(AlertRecord::try_from).transpose()?)
    }

    async fn count_vehicles(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

// =============================================================================
// Row types
// =============================================================================

/// A row from the `vehicles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VehicleRow {
    /// Roster identifier.
    pub vehicle_id: String,
    /// Manufacturer.
    pub make: String,
    /// Model name.
    pub model: String,
    /// Status as stored (`active`, `idle`, ...).
    pub status: String,
    /// Registered odometer reading.
    pub odometer: f64,
}

impl TryFrom<VehicleRow> for VehicleRecord {
    type Error = DbError;

    fn try_from(row: VehicleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse().map_err(|e| invalid("vehicles", e))?,
            vehicle_id: VehicleId::new(row.vehicle_id),
            make: row.make,
            model: row.model,
            odometer: row.odometer,
        })
    }
}

/// A row from the `telemetry` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TelemetryRow {
    /// Vehicle the snapshot belongs to.
    pub vehicle_id: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Heading in degrees.
    pub heading: f64,
    /// Speed in km/h.
    pub speed: f64,
    /// Fuel percent.
    pub fuel_level: f64,
    /// Engine temperature in Celsius.
    pub engine_temp: f64,
    /// Battery volts.
    pub battery_voltage: f64,
    /// Odometer in km.
    pub odometer: f64,
    /// Lidar reporting.
    pub lidar_active: bool,
    /// Radar object count.
    pub radar_objects: i32,
    /// Camera status as stored.
    pub camera_status: String,
    /// Emergency braking fired.
    pub emergency_braking: bool,
    /// When the snapshot was taken.
    pub recorded_at: DateTime<Utc>,
}

impl TryFrom<TelemetryRow> for TelemetrySnapshot {
    type Error = DbError;

    fn try_from(row: TelemetryRow) -> Result<Self, Self::Error> {
        let radar_objects = u32::try_from(row.radar_objects)
            .map_err(|e| invalid("telemetry", e))?;
        let camera_status = row
            .camera_status
            .parse()
            .map_err(|e| invalid("telemetry", e))?;
        Ok(Self {
            state: VehicleState {
                vehicle_id: VehicleId::new(row.vehicle_id),
                latitude: row.latitude,
                longitude: row.longitude,
                heading: row.heading,
                speed: row.speed,
                fuel_level: row.fuel_level,
                engine_temp: row.engine_temp,
                battery_voltage: row.battery_voltage,
                odometer: row.odometer,
                lidar_active: row.lidar_active,
                radar_objects,
                camera_status,
                emergency_braking: row.emergency_braking,
            },
            recorded_at: row.recorded_at,
        })
    }
}

/// A row from the `alerts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AlertRow {
    /// Alert identifier.
    pub id: Uuid,
    /// Vehicle the alert refers to.
    pub vehicle_id: String,
    /// Category as stored.
    pub category: String,
    /// Human-readable message.
    pub message: String,
    /// Severity level.
    pub severity: i16,
    /// Whether an operator acknowledged it.
    pub acknowledged: bool,
    /// When it was raised.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for AlertRecord {
    type Error = DbError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let severity = u8::try_from(row.severity).map_err(|e| invalid("alerts", e))?;
        Ok(Self {
            id: AlertId::from(row.id),
            event: AlertEvent {
                vehicle_id: VehicleId::new(row.vehicle_id),
                category: row.category.parse().map_err(|e| invalid("alerts", e))?,
                message: row.message,
                severity: Severity(severity),
                created_at: row.created_at,
            },
            acknowledged: row.acknowledged,
        })
    }
}

fn invalid(table: &'static str, err: impl std::fmt::Display) -> DbError {
    DbError::InvalidRow {
        table,
        reason: err.to_string(),
    }
}
