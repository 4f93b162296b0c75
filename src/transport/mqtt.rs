//! MQTT publisher for the output broker.
//!
//! The event loop runs on a detached task and keeps retrying the broker on
//! its own; publishing is a fire-and-forget submit into the client's
//! request queue. Retained messages mean a subscriber arriving between
//! changes still sees the last published value.

use super::{client_id, StatePublisher};
use crate::error::ConnectError;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Pause between polls after a network error, so a dead broker is not
/// hammered in a tight loop.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Publishes retained space states to the output broker.
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect to `address` (`host`, `host:port`, or an `mqtt://` URL) and
    /// start the network loop in the background.
    pub fn connect(address: &str) -> Result<Self, ConnectError> {
        let (host, port) = parse_address(address)?;

        let mut options = MqttOptions::new(client_id("spacestate"), host, port);
        options.set_keep_alive(Duration::from_secs(60));
        let (client, mut eventloop) = AsyncClient::new(options, 64);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("output broker connected");
                    }
                    Ok(event) => {
                        debug!(?event, "output broker event");
                    }
                    Err(e) => {
                        warn!(error = %e, "output broker connection error");
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        });

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl StatePublisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), ConnectError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, payload)
            .await
            .map_err(|e| ConnectError::PublishFailed(Box::new(e)))
    }
}

/// Accept `host`, `host:port`, or `mqtt://host[:port]`. The port defaults
/// to 1883.
fn parse_address(address: &str) -> Result<(String, u16), ConnectError> {
    if address.is_empty() {
        return Err(ConnectError::InvalidAddress(address.to_string()));
    }

    if address.contains("://") {
        let url =
            Url::parse(address).map_err(|_| ConnectError::InvalidAddress(address.to_string()))?;
        if url.scheme() != "mqtt" {
            return Err(ConnectError::InvalidAddress(address.to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ConnectError::InvalidAddress(address.to_string()))?;
        return Ok((host.to_string(), url.port().unwrap_or(1883)));
    }

    match address.split_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .map_err(|_| ConnectError::InvalidAddress(address.to_string()))?;
            Ok((host.to_string(), port))
        }
        None => Ok((address.to_string(), 1883)),
    }
}
