//! Per-space state tracking.
//!
//! One [`SpaceTracker`] exists per configured space for the life of the
//! process. It owns the space's resolved state, the polling schedule with
//! its failure backoff, and the optional push channel to the broker the
//! space runs itself. The aggregator drives it through [`SpaceTracker::tick`],
//! which never blocks beyond a bounded fetch and never panics on a failing
//! source.

mod push;

pub use push::{ConnectionState, PushChannel};

use crate::config::{SpaceConfig, SpaceMqttConfig};
use crate::status::StatusSource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Backoff applied to the poll deadline after a failed fetch. Added to the
/// missed deadline rather than to the current time, so repeated failures
/// keep the original cadence instead of drifting.
const ERROR_BACKOFF: Duration = Duration::from_secs(900);

/// Resolved open/closed state of a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceState {
    Open,
    Closed,
    Unknown,
}

impl SpaceState {
    pub fn as_str(self) -> &'static str {
        match self {
            SpaceState::Open => "open",
            SpaceState::Closed => "closed",
            SpaceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SpaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one space.
pub struct SpaceTracker {
    topic: String,
    state: Option<SpaceState>,
    source_url: Option<String>,
    next_poll_at: Instant,
    poll_interval: Duration,
    push_state_ttl: Duration,
    reconnect_interval: Duration,
    push: Option<PushChannel>,
    fetcher: Arc<dyn StatusSource>,
}

impl SpaceTracker {
    /// Build a tracker from its configuration and an already-resolved
    /// status URL. A statically configured broker endpoint is adopted
    /// immediately.
    pub fn new(
        config: &SpaceConfig,
        source_url: Option<String>,
        fetcher: Arc<dyn StatusSource>,
    ) -> Self {
        let mut tracker = Self {
            topic: config.topic.clone(),
            state: None,
            source_url,
            next_poll_at: Instant::now(),
            poll_interval: Duration::from_secs(config.interval),
            push_state_ttl: Duration::from_secs(config.mqtt_timeout),
            reconnect_interval: Duration::from_secs(config.mqtt_reconnect_interval),
            push: None,
            fetcher,
        };
        if let Some(endpoint) = &config.mqtt {
            tracker.adopt_endpoint(endpoint.clone());
        }
        tracker
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Current resolved state; `None` only before the first resolution.
    pub fn state(&self) -> Option<SpaceState> {
        self.state
    }

    pub fn next_poll_at(&self) -> Instant {
        self.next_poll_at
    }

    pub fn push_channel(&self) -> Option<&PushChannel> {
        self.push.as_ref()
    }

    /// Adopt a broker endpoint, from static configuration or discovered in
    /// a fetched document. The first endpoint set wins; later calls are
    /// no-ops, as is an endpoint that declares no host.
    pub fn adopt_endpoint(&mut self, endpoint: SpaceMqttConfig) {
        if self.push.is_some() {
            return;
        }
        self.push = PushChannel::open(endpoint, self.reconnect_interval);
    }

    /// One non-blocking driver step: drain push events, reconnect the push
    /// channel if due, then poll the status URL if its deadline passed.
    pub async fn tick(&mut self, now: Instant) {
        if let Some(push) = &mut self.push {
            for state in push.drain(now).await {
                self.state = Some(state);
                self.next_poll_at = now + self.push_state_ttl;
            }
            push.maybe_reconnect(now);
        }

        let Some(url) = self.source_url.clone() else {
            self.state = Some(SpaceState::Unknown);
            return;
        };

        if now < self.next_poll_at {
            return;
        }

        debug!(topic = %self.topic, url = %url, "refreshing space status");
        match self.fetcher.fetch(&url).await {
            Ok(status) => {
                self.state = Some(if status.open {
                    SpaceState::Open
                } else {
                    SpaceState::Closed
                });
                self.next_poll_at = now + self.poll_interval;
                if let Some(endpoint) = status.mqtt {
                    self.adopt_endpoint(endpoint);
                }
            }
            Err(e) => {
                warn!(topic = %self.topic, error = %e, "unable to check space state");
                self.next_poll_at += ERROR_BACKOFF;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::push::PushEvent;
    use super::*;
    use crate::status::SpaceStatus;
    use crate::testing::ScriptedStatusSource;

    fn tracker_with_endpoint(source: Arc<ScriptedStatusSource>) -> SpaceTracker {
        let config = SpaceConfig {
            topic: "somespace".to_string(),
            url: Some("https://somespace.example/spaceapi".to_string()),
            mqtt: Some(SpaceMqttConfig {
                host: Some("127.0.0.1".to_string()),
                port: 1,
                topic: Some("somespace/status".to_string()),
                open: None,
                closed: None,
            }),
            ..Default::default()
        };
        SpaceTracker::new(&config, config.url.clone(), source)
    }

    #[tokio::test]
    async fn push_message_sets_state_and_suppresses_polling() {
        let source = Arc::new(ScriptedStatusSource::new());
        let mut tracker = tracker_with_endpoint(source.clone());
        let now = Instant::now();

        tracker.push.as_ref().unwrap().inject(PushEvent::Message {
            topic: "somespace/status".to_string(),
            payload: "closed".to_string(),
        });
        tracker.tick(now).await;

        assert_eq!(tracker.state(), Some(SpaceState::Closed));
        // The TTL pushes the poll deadline out, so no fetch happened.
        assert_eq!(tracker.next_poll_at(), now + Duration::from_secs(300));
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn unmatched_push_payload_resolves_to_unknown() {
        let source = Arc::new(ScriptedStatusSource::new());
        let mut tracker = tracker_with_endpoint(source);
        let now = Instant::now();

        tracker.push.as_ref().unwrap().inject(PushEvent::Message {
            topic: "somespace/status".to_string(),
            payload: "flurb".to_string(),
        });
        tracker.tick(now).await;

        assert_eq!(tracker.state(), Some(SpaceState::Unknown));
    }

    #[tokio::test]
    async fn latest_of_several_queued_messages_wins() {
        let source = Arc::new(ScriptedStatusSource::new());
        let mut tracker = tracker_with_endpoint(source);
        let push = tracker.push.as_ref().unwrap();

        push.inject(PushEvent::Message {
            topic: "somespace/status".to_string(),
            payload: "open".to_string(),
        });
        push.inject(PushEvent::Message {
            topic: "somespace/status".to_string(),
            payload: "closed".to_string(),
        });
        tracker.tick(Instant::now()).await;

        assert_eq!(tracker.state(), Some(SpaceState::Closed));
    }

    #[tokio::test]
    async fn discovered_endpoint_does_not_replace_configured_one() {
        let source = Arc::new(ScriptedStatusSource::new());
        source.push_status(SpaceStatus {
            open: true,
            mqtt: Some(SpaceMqttConfig {
                host: Some("late.example.org".to_string()),
                port: 1883,
                topic: None,
                open: None,
                closed: None,
            }),
        });
        let mut tracker = tracker_with_endpoint(source);

        tracker.tick(Instant::now()).await;

        assert_eq!(tracker.state(), Some(SpaceState::Open));
        // First writer wins: the static endpoint is still the one in use.
        assert_eq!(tracker.push.as_ref().unwrap().host(), "127.0.0.1");
    }

    #[tokio::test]
    async fn discovered_endpoint_is_adopted_when_none_configured() {
        let source = Arc::new(ScriptedStatusSource::new());
        source.push_status(SpaceStatus {
            open: true,
            mqtt: Some(SpaceMqttConfig {
                host: Some("127.0.0.1".to_string()),
                port: 1,
                topic: Some("somespace/status".to_string()),
                open: None,
                closed: None,
            }),
        });
        let config = SpaceConfig {
            topic: "somespace".to_string(),
            url: Some("https://somespace.example/spaceapi".to_string()),
            ..Default::default()
        };
        let mut tracker = SpaceTracker::new(&config, config.url.clone(), source);
        assert!(tracker.push.is_none());

        tracker.tick(Instant::now()).await;

        assert_eq!(tracker.push.as_ref().unwrap().host(), "127.0.0.1");
    }
}
