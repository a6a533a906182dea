//! Best-effort key/value cache contract.
//!
//! Values are JSON strings. Callers treat every error as a miss on read
//! and as a no-op on write; nothing in the pipeline depends on the cache
//! being up.

use std::time::Duration;

use async_trait::async_trait;

/// Key holding the latest full fleet snapshot, written on the slow tick.
pub const LIVE_FLEET_KEY: &str = "vehicles:live";

/// Key holding the roster listing, written by the read API.
pub const ROSTER_KEY: &str = "vehicles:all";

/// Errors raised by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache could not be reached.
    #[error("cache unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description.
        reason: String,
    },

    /// A command reached the cache and failed.
    #[error("cache command failed: {source}")]
    Backend {
        /// The underlying client error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CacheError {
    /// Wrap any client error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(err),
        }
    }
}

/// String cache with per-entry expiry.
#[async_trait]
pub trait FleetCache: Send + Sync {
    /// Current value of `key`, if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key` for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}
