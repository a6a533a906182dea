//! Data layer for the fleet telemetry simulator (`PostgreSQL` + `Dragonfly`).
//!
//! `PostgreSQL` is the durable store: roster, telemetry history, alerts.
//! `Dragonfly` is a best-effort cache in front of it. Both are reached
//! only through the core's collaborator traits, so the simulator and the
//! read API run unchanged against the in-memory backends.
//!
//! # Architecture
//!
//! ```text
//! Slow tick / read API
//!     |
//!     +-- FleetRepository --> PgFleetRepository --> PostgreSQL (PostgresPool)
//!     |                                          |-- vehicles
//!     |                                          |-- telemetry
//!     |                                          +-- alerts
//!     |
//!     +-- FleetCache ------> DragonflyCache ----> Dragonfly
//! ```
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) cache
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`repository`] -- Fleet queries and row mapping
//! - [`error`] -- Shared error types

pub mod dragonfly;
pub mod error;
pub mod postgres;
pub mod repository;

// Re-export primary types for convenience.
pub use dragonfly::DragonflyCache;
pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use repository::{AlertRow, PgFleetRepository, TelemetryRow, VehicleRow};
