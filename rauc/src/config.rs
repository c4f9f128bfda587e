use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const LOCAL_CONFIG: &str = "./rauc-client.toml";
const SYSTEM_CONFIG: &str = "/etc/rauc/client.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BusKind {
    #[default]
    System,
    Session,
}

/// Where to find the daemon and how to wait for it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bus: BusKind,
    pub service: String,
    pub object_path: String,
    /// Signals queued for a pending install before the oldest are dropped.
    pub channel_capacity: usize,
    pub completion_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            service: "de.pengutronix.rauc".to_string(),
            object_path: "/".to_string(),
            channel_capacity: 10,
            completion_timeout_secs: None,
        }
    }
}

impl Config {
    /// Loads `location` if given, otherwise the first of the local and the
    /// system config file that exists, falling back to the defaults.
    pub fn load(location: Option<&Path>) -> Result<Self> {
        if let Some(location) = location {
            info!("Loading config: {}", location.display());
            return Self::load_from_path(location);
        }

        for candidate in [LOCAL_CONFIG, SYSTEM_CONFIG] {
            let path = Path::new(candidate);
            if path.exists() {
                info!("Loading config: {candidate}");
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(location: &Path) -> Result<Self> {
        let invalid = |reason: String| Error::Config {
            path: Some(PathBuf::from(location)),
            reason,
        };

        let contents = std::fs::read_to_string(location).map_err(|e| invalid(e.to_string()))?;
        let config: Config = toml::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        config.validate().map_err(invalid)?;

        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be at least 1".into());
        }
        if self.completion_timeout_secs == Some(0) {
            return Err("completion_timeout_secs must be positive, omit it to wait forever".into());
        }
        if !self.object_path.starts_with('/') {
            return Err(format!("object_path '{}' is not absolute", self.object_path));
        }
        Ok(())
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout_secs.map(Duration::from_secs)
    }
}
