//! Simulator binary for the fleet telemetry demo.
//!
//! Wires the simulation, its persistence and cache backends, the live
//! channel, and the read API server, then runs the tick scheduler until
//! Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `fleet-config.yaml` (or `FLEET_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Open the persistence store (lazily) and connect the cache
//! 4. Build the live channel (`WebSocket` broadcast, optional NATS mirror)
//! 5. Spawn the observer server
//! 6. Migrate the store and seed the fleet from the roster, with bounded
//!    retries. A store that stays down leaves the read API up and the
//!    simulator unstarted.
//! 7. Start the tick scheduler
//! 8. Wait for Ctrl-C, then stop the scheduler and exit

mod backends;
mod error;
mod nats_channel;

use std::path::PathBuf;
use std::sync::Arc;

use fleet_core::channel::{FanoutChannel, LiveChannel};
use fleet_core::config::{FleetConfig, LoggingConfig};
use fleet_core::scheduler::Scheduler;
use fleet_core::seed;
use fleet_core::sink::BroadcastSink;
use fleet_core::tick::Simulation;
use fleet_observer::{AppState, ServerConfig};
use fleet_types::VehicleRecord;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::backends::Backends;
use crate::error::EngineError;
use crate::nats_channel::NatsChannel;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "fleet-config.yaml";

/// Application entry point for the simulator.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the observer server
/// cannot be brought up.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!(
        fast_tick_ms = config.simulation.fast_tick_ms,
        slow_tick_ms = config.simulation.slow_tick_ms,
        storage = ?config.storage.backend,
        cache = ?config.cache.backend,
        "fleet-engine starting"
    );

    // 3. Open backends. Nothing here waits on the database.
    let backends = Backends::connect(&config.storage, &config.cache).await?;

    // 4. Live channel: WebSocket clients always, NATS when configured.
    let app_state = Arc::new(AppState::with_capacity(
        Arc::clone(&backends.repository),
        Arc::clone(&backends.cache),
        config.live.broadcast_capacity,
        config.cache.roster_ttl(),
    ));
    let mut channel = FanoutChannel::new().with(Arc::clone(&app_state) as Arc<dyn LiveChannel>);
    if let Some(nats_url) = &config.live.nats_url {
        match NatsChannel::connect(nats_url).await {
            Ok(nats) => {
                info!(nats_url = %nats_url, "Mirroring live events to NATS");
                channel = channel.with(Arc::new(nats));
            }
            Err(e) => warn!(error = %e, "NATS mirror disabled"),
        }
    }

    // 5. Start the observer server. Reads are served even if seeding fails.
    let observer =
        fleet_observer::spawn_observer(ServerConfig::from(&config.observer), Arc::clone(&app_state))
            .map_err(EngineError::from)?;

    // 6. Seed the fleet.
    let sink = Arc::new(BroadcastSink::new(
        Arc::clone(&backends.repository),
        Arc::new(channel),
        Arc::clone(&backends.cache),
        config.cache.fleet_ttl(),
    ));
    let mut scheduler = Scheduler::from_config(Simulation::new(&config), sink, &config.simulation);

    match load_roster(&backends, &config).await {
        Ok(roster) => {
            scheduler.seed(&roster);
            // 7. Start the tick scheduler.
            scheduler.start();
        }
        Err(e) => {
            error!(error = %e, "Could not load vehicle roster, simulator not started");
        }
    }

    // 8. Run until Ctrl-C.
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown requested");

    scheduler.stop();
    observer.abort();
    backends.close().await;

    info!("fleet-engine shutdown complete");
    Ok(())
}

/// Migrate the store, then load the roster. Both steps retry on the
/// seeding schedule.
async fn load_roster(
    backends: &Backends,
    config: &FleetConfig,
) -> Result<Vec<VehicleRecord>, EngineError> {
    backends.migrate(&config.seeding).await?;
    Ok(seed::load_roster_with_retry(backends.repository.as_ref(), &config.seeding).await?)
}

/// Load configuration from `FLEET_CONFIG` or `fleet-config.yaml`.
///
/// A missing file means defaults (with environment overrides applied); an
/// unreadable or invalid one is an error.
fn load_config() -> Result<FleetConfig, EngineError> {
    let path = std::env::var_os("FLEET_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        Ok(FleetConfig::from_file(&path)?)
    } else {
        Ok(FleetConfig::parse("")?)
    }
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence
/// over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
