pub mod ask;
pub mod config_cmd;
pub mod courses;
pub mod events;
pub mod sync;
pub mod unanswered;

use std::path::Path;
use studybot_config::AppConfig;

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    tracing::debug!(path = ?path, "Loading configuration");
    let config = match path {
        Some(p) => AppConfig::load_with_env(p),
        None => AppConfig::load(),
    };
    Ok(config.map_err(|e| format!("Failed to load config: {e}"))?)
}
