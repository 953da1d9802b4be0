//! Configuration file schema and loader
//!
//! Settings live in `concierge.toml` under the platform config directory.
//! Every key is optional; a missing file means all defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::reveal::{RevealPolicy, DEFAULT_REVEAL_SECS};

const CONFIG_FILE: &str = "concierge.toml";
const DATABASE_FILE: &str = "concierge.db";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConciergeConfig {
    pub reveal: RevealConfig,
    pub storage: StorageConfig,
}

/// `[reveal]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    /// How long the door code stays visible after check-in
    pub duration_secs: u32,
    /// Countdown refresh period
    pub tick_interval_ms: u64,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_REVEAL_SECS,
            tick_interval_ms: 1000,
        }
    }
}

impl RevealConfig {
    pub fn policy(&self) -> RevealPolicy {
        RevealPolicy {
            duration_secs: self.duration_secs,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Overrides the database location in the data directory
    pub database_path: Option<PathBuf>,
}

impl ConciergeConfig {
    /// Parse configuration from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.reveal.duration_secs == 0 {
            return Err(Error::Config("reveal.duration_secs must be positive".to_string()));
        }
        if self.reveal.tick_interval_ms == 0 {
            return Err(Error::Config("reveal.tick_interval_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Database location: the configured path or the platform data directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(DATABASE_FILE)),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "onyx", "concierge").ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine data directory",
        ))
    })
}

/// Default location of the configuration file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE))
}
