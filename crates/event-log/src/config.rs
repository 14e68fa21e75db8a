use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Where each event category is written.
///
/// An empty path sends that category to standard output.
#[derive(Debug, Clone, Deserialize)]
pub struct EventLogConfig {
    #[serde(default)]
    pub access_log: PathBuf,
    #[serde(default)]
    pub tls_log: PathBuf,
    /// Events a channel holds before producers wait.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            access_log: PathBuf::new(),
            tls_log: PathBuf::new(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1
}

/// Load the event log configuration from a YAML file.
///
/// A missing file yields the defaults (both categories on standard output)
/// and a warning.
pub fn load(path: &Path) -> Result<EventLogConfig> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "event log configuration not found; using defaults"
        );
        return Ok(EventLogConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    load_from_str(&contents)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

/// Parse and validate an [`EventLogConfig`] from YAML text.
pub fn load_from_str(yaml: &str) -> Result<EventLogConfig> {
    let config: EventLogConfig =
        serde_yml::from_str(yaml).context("YAML deserialization failed")?;
    if config.channel_capacity == 0 {
        bail!("channel_capacity must be at least 1");
    }
    Ok(config)
}
