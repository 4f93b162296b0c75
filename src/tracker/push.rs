//! Push-based status updates from a space's own broker.
//!
//! A [`PushChannel`] owns one MQTT connection. The rumqttc event loop runs
//! in a spawned task that forwards connection events and publishes into a
//! bounded queue; the tracker drains that queue at the start of every
//! `tick()`, so all state mutation stays on the driver loop. A connection
//! failure ends the event-loop task, and the next reconnect attempt builds
//! a fresh client and task pair.

use crate::config::SpaceMqttConfig;
use crate::tracker::SpaceState;
use crate::transport::client_id;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Depth of the event queue between the broker task and the tracker. The
/// queue is drained at least every loop iteration; the sender awaits when
/// it is momentarily full.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Connection lifecycle of a push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug)]
pub(crate) enum PushEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: String },
}

/// One optional connection to the broker a space runs itself.
pub struct PushChannel {
    config: SpaceMqttConfig,
    host: String,
    connection: ConnectionState,
    reconnect_at: Option<Instant>,
    reconnect_interval: Duration,
    reconnect_count: u32,
    client: AsyncClient,
    events: mpsc::Receiver<PushEvent>,
    event_tx: mpsc::Sender<PushEvent>,
    loop_handle: JoinHandle<()>,
}

impl PushChannel {
    /// Open a channel to the space's broker. An endpoint without a host is
    /// permanently inert; `None` is returned and no connection is ever
    /// attempted.
    pub(crate) fn open(config: SpaceMqttConfig, reconnect_interval: Duration) -> Option<Self> {
        let host = config.host.clone()?;
        info!(host = %host, "configuring push channel");

        let (event_tx, events) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (client, loop_handle) = spawn_connection(&host, config.port, event_tx.clone());

        Some(Self {
            config,
            host,
            connection: ConnectionState::Connecting,
            reconnect_at: None,
            reconnect_interval,
            reconnect_count: 0,
            client,
            events,
            event_tx,
            loop_handle,
        })
    }

    /// Apply queued broker events. Returns the state resolutions carried
    /// by push messages, oldest first; the caller applies them in order so
    /// the most recent one wins.
    pub(crate) async fn drain(&mut self, now: Instant) -> Vec<SpaceState> {
        let mut resolved = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            match event {
                PushEvent::Connected => {
                    self.connection = ConnectionState::Connected;
                    self.reconnect_at = None;
                    self.subscribe().await;
                }
                PushEvent::Disconnected => {
                    if self.connection != ConnectionState::Disconnected {
                        warn!(host = %self.host, "push broker disconnected");
                    }
                    self.connection = ConnectionState::Disconnected;
                    self.reconnect_at = Some(now + self.reconnect_interval);
                }
                PushEvent::Message { topic, payload } => {
                    if Some(topic.as_str()) == self.config.topic.as_deref() {
                        resolved.push(classify(&self.config, &payload));
                    }
                }
            }
        }
        resolved
    }

    /// One reconnect attempt, if disconnected and the backoff deadline has
    /// passed. A failed attempt surfaces as a `Disconnected` event on the
    /// next drain, which re-arms the deadline.
    pub(crate) fn maybe_reconnect(&mut self, now: Instant) {
        if self.connection != ConnectionState::Disconnected {
            return;
        }
        let Some(reconnect_at) = self.reconnect_at else {
            return;
        };
        if now < reconnect_at {
            return;
        }

        info!(host = %self.host, "attempting reconnect");
        self.reconnect_count += 1;
        self.loop_handle.abort();
        let (client, loop_handle) =
            spawn_connection(&self.host, self.config.port, self.event_tx.clone());
        self.client = client;
        self.loop_handle = loop_handle;
        self.connection = ConnectionState::Connecting;
        self.reconnect_at = None;
    }

    async fn subscribe(&self) {
        let Some(topic) = self.config.topic.as_deref() else {
            return;
        };
        match self.client.subscribe(topic, QoS::AtMostOnce).await {
            Ok(()) => debug!(host = %self.host, topic = %topic, "subscribed to push topic"),
            Err(e) => warn!(host = %self.host, error = %e, "unable to subscribe to push topic"),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn reconnect_at(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count
    }

    #[cfg(test)]
    pub(crate) fn inject(&self, event: PushEvent) {
        self.event_tx.try_send(event).expect("event queue full");
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.loop_handle.abort();
    }
}

/// Map a push payload onto a space state. An unmatched payload means the
/// space is announcing something this system does not understand, which
/// resolves to `unknown` rather than an error.
fn classify(config: &SpaceMqttConfig, payload: &str) -> SpaceState {
    if payload == config.closed_payload() {
        SpaceState::Closed
    } else if payload == config.open_payload() {
        SpaceState::Open
    } else {
        SpaceState::Unknown
    }
}

fn spawn_connection(
    host: &str,
    port: u16,
    tx: mpsc::Sender<PushEvent>,
) -> (AsyncClient, JoinHandle<()>) {
    let mut options = MqttOptions::new(client_id("spacestate-push"), host, port);
    options.set_keep_alive(Duration::from_secs(60));
    let (client, eventloop) = AsyncClient::new(options, 10);
    let handle = tokio::spawn(run_event_loop(eventloop, tx));
    (client, handle)
}

/// Forward broker events into the tracker's queue. Ends on the first
/// connection failure; reconnection is scheduled by the tracker, not here.
async fn run_event_loop(mut eventloop: EventLoop, tx: mpsc::Sender<PushEvent>) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                if tx.send(PushEvent::Connected).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let payload = String::from_utf8_lossy(&publish.payload).into_owned();
                let message = PushEvent::Message {
                    topic: publish.topic,
                    payload,
                };
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                let _ = tx.send(PushEvent::Disconnected).await;
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "push event loop error");
                let _ = tx.send(PushEvent::Disconnected).await;
                break;
            }
        }
    }
}
