//! `Dragonfly` (Redis-compatible) cache.
//!
//! Holds short-lived JSON views that spare the read API a database round
//! trip. Every key carries an expiry; nothing here is a source of truth.
//!
//! # Key Patterns
//!
//! | Key | Writer | TTL | Description |
//! |-----|--------|-----|-------------|
//! | `vehicles:live` | slow tick | 60s | Latest full fleet snapshot |
//! | `vehicles:all` | read API | 30s | Roster listing |

use std::time::Duration;

use async_trait::async_trait;
use fleet_core::cache::{CacheError, FleetCache};
use fred::prelude::*;
use fred::types::Expiration;

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyCache {
    client: Client,
}

impl DragonflyCache {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Store `value` at `key`, expiring after `ttl` (rounded up to whole
    /// seconds, minimum one).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the write fails.
    pub async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DbError> {
        let _: () = self
            .client
            .set(key, value, Some(Expiration::EX(ttl_seconds(ttl))), None, false)
            .await?;
        Ok(())
    }

    /// Read the string at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the read fails.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        Ok(value)
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the quit command fails.
    pub async fn quit(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        tracing::info!("Dragonfly connection closed");
        Ok(())
    }
}

/// Whole seconds for an `EX` expiry. Sub-second TTLs round up so the key
/// never lands without an expiry or with a zero one.
fn ttl_seconds(ttl: Duration) -> i64 {
    let secs = ttl
        .as_secs()
        .saturating_add(u64::from(ttl.subsec_nanos() > 0))
        .max(1);
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl FleetCache for DragonflyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.get_string(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        Ok(self.set_with_ttl(key, value, ttl).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_seconds(Duration::from_secs(60)), 60);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
        assert_eq!(ttl_seconds(Duration::from_secs(u64::MAX)), i64::MAX);
    }
}
