//! Error types for the simulator binary.
//!
//! [`EngineError`] wraps every failure that can stop startup, so `main`
//! can propagate with `?`. Failures after startup (persistence writes,
//! cache refreshes, NATS publishes) are logged where they happen instead.

/// Top-level error for the simulator binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fleet_core::config::ConfigError,
    },

    /// The persistence store could not be opened or migrated.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying database error.
        #[from]
        source: fleet_db::DbError,
    },

    /// The roster could not be loaded.
    #[error("seeding error: {source}")]
    Seed {
        /// The underlying seeding error.
        #[from]
        source: fleet_core::seed::SeedError,
    },

    /// NATS connection failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// The observer server could not be started.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: fleet_observer::StartupError,
    },
}
