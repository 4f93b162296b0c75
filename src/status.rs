//! Status document fetching.
//!
//! A space's status is a SpaceAPI JSON document; the only parts this
//! system reads are the `state.open` boolean and an optional `state.mqtt`
//! broker endpoint the document may declare. Fetching sits behind the
//! [`StatusSource`] trait so trackers can be driven by a scripted source
//! in tests.

use crate::config::SpaceMqttConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Bound on a single status fetch so a hung server cannot stall the
/// tracker loop.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// The parts of a status document the trackers care about.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceStatus {
    pub open: bool,
    /// Broker endpoint declared inside the document, if any.
    pub mqtt: Option<SpaceMqttConfig>,
}

/// Source of space status documents.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<SpaceStatus, FetchError>;
}

#[derive(Deserialize)]
struct StatusDocument {
    state: Option<StateSection>,
}

#[derive(Deserialize)]
struct StateSection {
    open: Option<bool>,
    mqtt: Option<SpaceMqttConfig>,
}

/// Fetches status documents over HTTP.
pub struct HttpStatusSource {
    client: reqwest::Client,
}

impl HttpStatusSource {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client, e.g. the one the directory lookup used.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, url: &str) -> Result<SpaceStatus, FetchError> {
        let document: StatusDocument = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // A document that does not state whether the space is open is a
        // failed fetch, not an unknown state: the tracker keeps its last
        // resolution and backs off.
        let state = document
            .state
            .ok_or_else(|| FetchError::Document("missing state section".to_string()))?;
        let open = state
            .open
            .ok_or_else(|| FetchError::Document("state.open is absent or null".to_string()))?;

        Ok(SpaceStatus {
            open,
            mqtt: state.mqtt,
        })
    }
}
