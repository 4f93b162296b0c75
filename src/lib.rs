//! spacestate
//!
//! Tracks the open/closed status of a set of hackerspaces and republishes
//! each status as a retained message on an output MQTT broker. A space
//! reports status either through its SpaceAPI document, polled over HTTP,
//! or by pushing payloads on a broker it runs itself; both sources feed
//! the same per-space tracker, and the most recent resolution wins.
//!
//! # Overview
//!
//! - [`config`]: `config.json` loading and per-space settings
//! - [`tracker`]: per-space state machine: polling, failure backoff, and
//!   the optional push channel to the space's own broker
//! - [`aggregator`]: the drive loop and the publish-on-change diffing
//! - [`status`] / [`directory`]: SpaceAPI document fetching and directory
//!   name resolution
//! - [`transport`]: the output broker client
//!
//! ```no_run
//! use spacestate::{Aggregator, Config, HttpStatusSource, MqttPublisher, SpaceTracker};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_from_file(Path::new("config.json"))?;
//! let publisher = MqttPublisher::connect(&config.server)?;
//! let fetcher = Arc::new(HttpStatusSource::new()?);
//!
//! let trackers = config
//!     .spaces
//!     .iter()
//!     .map(|space| SpaceTracker::new(space, space.url.clone(), fetcher.clone()))
//!     .collect();
//!
//! let mut aggregator = Aggregator::new(trackers, publisher, config.prefix.clone());
//! aggregator.run().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod status;
pub mod testing;
pub mod tracker;
pub mod transport;

pub use aggregator::Aggregator;
pub use config::{Config, ConfigError, SpaceConfig, SpaceMqttConfig};
pub use error::{ConnectError, FetchError};
pub use status::{HttpStatusSource, SpaceStatus, StatusSource};
pub use tracker::{ConnectionState, SpaceState, SpaceTracker};
pub use transport::{MqttPublisher, StatePublisher};
