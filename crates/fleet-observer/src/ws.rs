//! Live event stream over `WebSocket`.
//!
//! `GET /ws` streams [`LiveEvent`]s as JSON text frames shaped
//! `{"topic": ..., "payload": ...}`. `?topics=telemetry,alert` narrows the
//! stream; omitting it selects both.
//!
//! A client subscribed to `telemetry` first receives one `telemetry` frame
//! holding the current fleet, so a dashboard can draw before the next fast
//! tick. Nothing else is replayed. A client that falls more than the
//! broadcast capacity behind loses the events it missed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use fleet_types::{LiveEvent, LiveTopic};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::error::ObserverError;
use crate::handlers::current_fleet;
use crate::state::AppState;

/// Query parameters for `GET /ws`.
#[derive(Debug, serde::Deserialize)]
pub struct LiveQuery {
    /// Comma-separated topic names.
    pub topics: Option<String>,
}

/// Which topics a live client receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicFilter {
    telemetry: bool,
    alert: bool,
}

impl TopicFilter {
    /// Every topic.
    pub const ALL: Self = Self {
        telemetry: true,
        alert: true,
    };

    /// Parse a `topics` query value. `None` selects every topic.
    ///
    /// # Errors
    ///
    /// Returns [`ObserverError::InvalidQuery`] for an unknown topic name or
    /// a list that names none.
    pub fn parse(raw: Option<&str>) -> Result<Self, ObserverError> {
        let Some(raw) = raw else {
            return Ok(Self::ALL);
        };
        let mut filter = Self {
            telemetry: false,
            alert: false,
        };
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match name {
                "telemetry" => filter.telemetry = true,
                "alert" => filter.alert = true,
                other => {
                    return Err(ObserverError::InvalidQuery(format!(
                        "unknown topic {other:?}, expected telemetry or alert"
                    )));
                }
            }
        }
        if filter.telemetry || filter.alert {
            Ok(filter)
        } else {
            Err(ObserverError::InvalidQuery(
                "topics must name at least one topic".to_owned(),
            ))
        }
    }

    /// Whether events on `topic` pass the filter.
    pub const fn accepts(self, topic: LiveTopic) -> bool {
        match topic {
            LiveTopic::Telemetry => self.telemetry,
            LiveTopic::Alert => self.alert,
        }
    }
}

/// `GET /ws` -- upgrade and start relaying live events.
pub async fn ws_live(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ObserverError> {
    let filter = TopicFilter::parse(query.topics.as_deref())?;
    Ok(ws.on_upgrade(move |socket| relay(socket, state, filter)))
}

async fn relay(mut socket: WebSocket, state: Arc<AppState>, filter: TopicFilter) {
    // Subscribe before reading the fleet so no tick falls between the two.
    let mut events = state.subscribe();
    debug!(subscribers = state.subscriber_count(), ?filter, "Live client connected");

    if filter.telemetry {
        match current_fleet(&state).await {
            Ok(fleet) if fleet.is_empty() => {}
            Ok(fleet) => {
                if send_event(&mut socket, &LiveEvent::Telemetry(fleet)).await.is_err() {
                    return;
                }
            }
            Err(e) => warn!(error = %e, "No current fleet for new live client"),
        }
    }

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) if filter.accepts(event.topic()) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Live client fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                // Pings are answered by the protocol layer and clients
                // send nothing else of interest.
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Live client disconnected");
}

/// Encode and send one event. An error means the client is gone.
async fn send_event(socket: &mut WebSocket, event: &LiveEvent) -> Result<(), axum::Error> {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            warn!(topic = event.topic().as_str(), error = %e, "Dropping unencodable live event");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn topics_default_to_all() {
        assert_eq!(TopicFilter::parse(None).unwrap(), TopicFilter::ALL);
        assert_eq!(
            TopicFilter::parse(Some("alert, telemetry")).unwrap(),
            TopicFilter::ALL
        );
    }

    #[test]
    fn single_topic_filters_the_other() {
        let alerts = TopicFilter::parse(Some("alert")).unwrap();
        assert!(alerts.accepts(LiveTopic::Alert));
        assert!(!alerts.accepts(LiveTopic::Telemetry));
    }

    #[test]
    fn unknown_or_empty_topics_are_rejected() {
        assert!(matches!(
            TopicFilter::parse(Some("telemetry,weather")),
            Err(ObserverError::InvalidQuery(_))
        ));
        assert!(matches!(
            TopicFilter::parse(Some(" , ")),
            Err(ObserverError::InvalidQuery(_))
        ));
    }
}
