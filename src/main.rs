//! spacestate: watches hackerspaces and republishes open/closed state.
//!
//! Reads `config.json` from the working directory, resolves directory
//! entries, and then drives the tracker loop until interrupted. A missing
//! configuration file exits with code 1; an interrupt exits with code 2
//! immediately, since the retained messages on the output broker outlive
//! the process and there is nothing to tear down.

use spacestate::aggregator::Aggregator;
use spacestate::config::Config;
use spacestate::directory;
use spacestate::status::{HttpStatusSource, StatusSource, FETCH_TIMEOUT};
use spacestate::tracker::SpaceTracker;
use spacestate::transport::MqttPublisher;
use std::collections::HashMap;
use std::path::Path;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    spacestate::logging::init();

    info!("loading config.json");
    let config = match Config::load_from_file(Path::new("config.json")) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config.json: {e}");
            process::exit(1);
        }
    };

    let mut aggregator = match bootstrap(config).await {
        Ok(aggregator) => aggregator,
        Err(e) => {
            error!("startup failed: {e}");
            process::exit(1);
        }
    };

    tokio::select! {
        _ = aggregator.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            process::exit(2);
        }
    }
}

/// Wire the trackers to the publisher. The directory is only consulted
/// when some space names an entry instead of carrying a direct URL.
async fn bootstrap(config: Config) -> Result<Aggregator<MqttPublisher>, Box<dyn std::error::Error>> {
    let publisher = MqttPublisher::connect(&config.server)?;

    let http = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

    let directory = if config.spaces.iter().any(|s| s.spacedirectory.is_some()) {
        info!("resolving the space directory");
        directory::fetch_directory(&http, directory::DIRECTORY_URL).await?
    } else {
        HashMap::new()
    };

    let fetcher: Arc<dyn StatusSource> = Arc::new(HttpStatusSource::with_client(http));
    let mut trackers = Vec::with_capacity(config.spaces.len());
    for space in &config.spaces {
        let source_url = directory::resolve_source_url(space, &directory)?;
        trackers.push(SpaceTracker::new(space, source_url, fetcher.clone()));
    }

    info!("tracking {} spaces", trackers.len());
    Ok(Aggregator::new(trackers, publisher, config.prefix))
}
