//! SpaceAPI directory lookup.
//!
//! The public directory maps space names to status document URLs. It is
//! consulted once at startup, and only when some space is configured with
//! a `spacedirectory` name instead of a direct `url`.

use crate::config::{ConfigError, SpaceConfig};
use crate::error::FetchError;
use std::collections::HashMap;

pub const DIRECTORY_URL: &str = "https://directory.spaceapi.io/";

/// Fetch the directory listing as a name-to-URL map.
pub async fn fetch_directory(
    client: &reqwest::Client,
    url: &str,
) -> Result<HashMap<String, String>, FetchError> {
    Ok(client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?)
}

/// Resolve the status URL for one space. A `spacedirectory` name takes
/// precedence over a direct `url`; a name the directory does not know is
/// a configuration error.
pub fn resolve_source_url(
    space: &SpaceConfig,
    directory: &HashMap<String, String>,
) -> Result<Option<String>, ConfigError> {
    if let Some(name) = &space.spacedirectory {
        return match directory.get(name) {
            Some(url) => Ok(Some(url.clone())),
            None => Err(ConfigError::UnknownDirectoryEntry {
                topic: space.topic.clone(),
                name: name.clone(),
            }),
        };
    }
    Ok(space.url.clone())
}
