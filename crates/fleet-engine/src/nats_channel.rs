//! NATS mirror of the live channel.
//!
//! Every [`LiveEvent`] is published to `fleet.<topic>` (`fleet.telemetry`,
//! `fleet.alert`) with the same JSON body the `WebSocket` clients receive.
//! Publishes are spawned and never awaited by the tick.

use fleet_core::channel::LiveChannel;
use fleet_types::{LiveEvent, LiveTopic};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Subject prefix for mirrored live events.
pub const SUBJECT_PREFIX: &str = "fleet";

/// The NATS subject for a topic.
pub fn subject(topic: LiveTopic) -> String {
    format!("{SUBJECT_PREFIX}.{}", topic.as_str())
}

/// Publishes live events to NATS.
pub struct NatsChannel {
    client: async_nats::Client,
}

impl NatsChannel {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self, EngineError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to connect to NATS at {url}: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl LiveChannel for NatsChannel {
    fn publish(&self, event: LiveEvent) -> usize {
        let subject = subject(event.topic());
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!(subject = %subject, error = %e, "Failed to serialize live event for NATS");
                return 0;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(subject = %subject, "No runtime available, NATS publish skipped");
            return 0;
        };

        let client = self.client.clone();
        runtime.spawn(async move {
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                warn!(subject = %subject, error = %e, "NATS publish failed");
            } else {
                debug!(subject = %subject, "Published live event to NATS");
            }
        });
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subjects_follow_topic_names() {
        assert_eq!(subject(LiveTopic::Telemetry), "fleet.telemetry");
        assert_eq!(subject(LiveTopic::Alert), "fleet.alert");
    }
}
