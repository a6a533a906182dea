//! Shared application state for the observer server.
//!
//! [`AppState`] carries the broadcast channel that feeds `WebSocket`
//! clients plus handles to the persistence store and cache that back the
//! read API. It is also the simulator's [`LiveChannel`]: publishing an
//! event pushes it to every connected client.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::cache::FleetCache;
use fleet_core::channel::LiveChannel;
use fleet_core::repository::FleetRepository;
use fleet_types::LiveEvent;
use tokio::sync::broadcast;

/// Default capacity of the live broadcast channel.
///
/// A subscriber that falls more than this many messages behind receives a
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest one.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Default lifetime of the cached roster listing.
pub const DEFAULT_ROSTER_TTL: Duration = Duration::from_secs(30);

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for live events.
    pub tx: broadcast::Sender<LiveEvent>,
    /// Durable store serving roster, history and alert reads.
    pub repository: Arc<dyn FleetRepository>,
    /// Best-effort cache in front of the roster and live fleet reads.
    pub cache: Arc<dyn FleetCache>,
    /// Expiry applied when the roster listing is cached.
    pub roster_ttl: Duration,
}

impl AppState {
    /// Create state over the given backends with default channel capacity
    /// and roster TTL.
    pub fn new(repository: Arc<dyn FleetRepository>, cache: Arc<dyn FleetCache>) -> Self {
        Self::with_capacity(
            repository,
            cache,
            DEFAULT_BROADCAST_CAPACITY,
            DEFAULT_ROSTER_TTL,
        )
    }

    /// Create state with an explicit broadcast capacity and roster TTL.
    ///
    /// A zero capacity is raised to one, since Tokio rejects empty
    /// broadcast channels.
    pub fn with_capacity(
        repository: Arc<dyn FleetRepository>,
        cache: Arc<dyn FleetCache>,
        capacity: usize,
        roster_ttl: Duration,
    ) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            repository,
            cache,
            roster_ttl,
        }
    }

    /// Subscribe to the live event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl LiveChannel for AppState {
    fn publish(&self, event: LiveEvent) -> usize {
        // send fails only when nobody is subscribed, which is the normal
        // state before the first dashboard connects.
        self.tx.send(event).unwrap_or(0)
    }
}
