//! Drives the trackers and republishes state changes.
//!
//! The aggregator owns the only copy of the last-published map and is the
//! only writer of it. Per iteration it ticks every tracker, compares the
//! resolved state against what was last sent for that topic, and publishes
//! a retained message only on first sight or on change. Not republishing
//! identical values keeps broker traffic down; retained messages mean late
//! subscribers still receive the last value.

use crate::tracker::{SpaceState, SpaceTracker};
use crate::transport::StatePublisher;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Cadence of the drive loop.
const LOOP_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the trackers, the output publisher, and the last-published map.
pub struct Aggregator<P> {
    trackers: Vec<SpaceTracker>,
    publisher: P,
    prefix: String,
    published: HashMap<String, &'static str>,
}

impl<P: StatePublisher> Aggregator<P> {
    pub fn new(trackers: Vec<SpaceTracker>, publisher: P, prefix: impl Into<String>) -> Self {
        Self {
            trackers,
            publisher,
            prefix: prefix.into(),
            published: HashMap::new(),
        }
    }

    /// Drive all trackers until the process is interrupted.
    pub async fn run(&mut self) {
        loop {
            self.step(Instant::now()).await;
            tokio::time::sleep(LOOP_INTERVAL).await;
        }
    }

    /// One pass over every tracker. A tracker with no resolution yet is
    /// reported as `unknown`; the first sighting of a topic is always
    /// published, even when it is `unknown`.
    pub async fn step(&mut self, now: Instant) {
        let Self {
            trackers,
            publisher,
            prefix,
            published,
        } = self;

        for tracker in trackers.iter_mut() {
            tracker.tick(now).await;

            let topic = format!("{prefix}{}", tracker.topic());
            let effective = tracker.state().unwrap_or(SpaceState::Unknown).as_str();

            match published.get(&topic) {
                Some(previous) if *previous == effective => {}
                Some(previous) => {
                    info!(topic = %topic, "changed from {previous} to {effective}");
                    if Self::submit(publisher, &topic, effective).await {
                        published.insert(topic, effective);
                    }
                }
                None => {
                    if Self::submit(publisher, &topic, effective).await {
                        published.insert(topic, effective);
                    }
                }
            }
        }
    }

    /// Submit one retained publish. On failure the map entry is left
    /// untouched so the value is retried on the next iteration.
    async fn submit(publisher: &P, topic: &str, payload: &str) -> bool {
        match publisher.publish(topic, payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(topic = %topic, error = %e, "publish failed");
                false
            }
        }
    }

    /// Last value sent per output topic.
    pub fn published(&self) -> &HashMap<String, &'static str> {
        &self.published
    }
}
