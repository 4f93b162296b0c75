//! Recoverable error types.
//!
//! Every failure here stays inside the tracker that hit it: a fetch error
//! backs off the poll deadline, a broker error schedules a reconnect.
//! Only [`crate::config::ConfigError`] aborts the process.

use thiserror::Error;

/// Failure fetching or interpreting a space's status document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid status document: {0}")]
    Document(String),
}

/// Failure talking to an MQTT broker.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid broker address: {0}")]
    InvalidAddress(String),
    #[error("publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
}
