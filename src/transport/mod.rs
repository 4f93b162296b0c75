//! Outbound transport for resolved space states.
//!
//! The aggregator publishes through the [`StatePublisher`] trait so tests
//! can substitute a recording sink for the real broker client.

use crate::error::ConnectError;

pub mod mqtt;

pub use mqtt::MqttPublisher;

/// Sink for resolved space states.
#[async_trait::async_trait]
pub trait StatePublisher: Send + Sync {
    /// Submit one retained publish. Submission is non-blocking; delivery
    /// happens on the client's own network loop.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ConnectError>;
}

#[async_trait::async_trait]
impl<P: StatePublisher + ?Sized> StatePublisher for std::sync::Arc<P> {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ConnectError> {
        (**self).publish(topic, payload).await
    }
}

/// Client id unique per connection attempt, so a reconnect is not refused
/// by a broker still holding the previous session.
pub(crate) fn client_id(prefix: &str) -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{prefix}-{timestamp}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_ids_carry_the_prefix() {
        let id = client_id("spacestate");
        assert!(id.starts_with("spacestate-"));
        assert!(id.len() > "spacestate-".len());
    }
}
