use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::schema::Configuration;

/// Read and parse the adapter configuration from disk.
///
/// Mirrors `PluginConfiguration.read_and_parse` in the original
/// implementation: a missing file is `NoConfiguration`, anything else wrong
/// with its content is `ConfigInvalid`/`Yaml`.
pub fn load_from_path(path: &Path) -> Result<Configuration> {
    tracing::info!(path = %path.display(), "loading adapter configuration");

    let content = std::fs::read_to_string(path).map_err(|_| ConfigError::NoConfiguration {
        path: path.display().to_string(),
    })?;

    Configuration::parse(&content)
}
