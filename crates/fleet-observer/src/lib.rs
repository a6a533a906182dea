//! Read API and live stream server for the fleet telemetry simulator.
//!
//! - **`WebSocket` endpoint** (`/ws`) relaying every
//!   [`LiveEvent`](fleet_types::LiveEvent) the simulator publishes via a
//!   [`tokio::sync::broadcast`] channel
//! - **REST endpoints** for the roster, live fleet, telemetry history and
//!   alerts, with acknowledgement
//! - **Health check** (`/health`) reporting store reachability
//!
//! # Architecture
//!
//! [`AppState`] is both the Axum state and the simulator's
//! [`LiveChannel`](fleet_core::channel::LiveChannel): the fast tick
//! publishes into it and connected clients receive the events. REST reads
//! go to the [`FleetRepository`](fleet_core::repository::FleetRepository)
//! behind an optional cache and never touch the simulation lock.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::AppState;
