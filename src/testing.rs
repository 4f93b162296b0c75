//! Test doubles for the fetch and publish seams.
//!
//! Used by the unit tests in this crate and by the integration tests under
//! `tests/`.

use crate::error::{ConnectError, FetchError};
use crate::status::{SpaceStatus, StatusSource};
use crate::transport::StatePublisher;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Status source that replays queued responses in order. An empty queue
/// yields a fetch failure, which is also how a scripted failure is
/// expressed.
#[derive(Default)]
pub struct ScriptedStatusSource {
    responses: Mutex<VecDeque<Result<SpaceStatus, FetchError>>>,
    fetch_count: AtomicUsize,
}

impl ScriptedStatusSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful fetch with no endpoint discovery.
    pub fn push_open(&self, open: bool) {
        self.push_status(SpaceStatus { open, mqtt: None });
    }

    pub fn push_status(&self, status: SpaceStatus) {
        self.responses.lock().unwrap().push_back(Ok(status));
    }

    pub fn push_failure(&self) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(FetchError::Document("scripted failure".to_string())));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatusSource for ScriptedStatusSource {
    async fn fetch(&self, _url: &str) -> Result<SpaceStatus, FetchError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Document("no scripted response".to_string())))
    }
}

/// Publisher that records every accepted publish, and can be switched into
/// a failing mode to exercise retry behavior.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepted publishes, in submission order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    /// Total submissions, including rejected ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ConnectError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConnectError::PublishFailed(
                "scripted publish failure".to_string().into(),
            ));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
