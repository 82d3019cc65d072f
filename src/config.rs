use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub reviewgraph: ReviewgraphConfig,
    #[serde(default)]
    pub serializer: SerializerConfig,
}

/// Storage and process configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewgraphConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Serializer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SerializerConfig {
    /// Deepest record nesting the serializer will enter before failing.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub pretty: bool,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            pretty: false,
        }
    }
}

fn default_max_depth() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace", "off"];

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in REVIEWGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // .env is optional
        let _ = dotenv::dotenv();

        let config_path = std::env::var("REVIEWGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        Self::from_path(&config_path)
    }

    /// Load and validate a configuration file at an explicit path
    pub fn from_path(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.reviewgraph.db_path.as_os_str().is_empty() {
            anyhow::bail!("reviewgraph.db_path must not be empty");
        }

        let level = self.reviewgraph.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            anyhow::bail!(
                "reviewgraph.log_level must be one of {:?}, got '{}'",
                LOG_LEVELS,
                self.reviewgraph.log_level
            );
        }

        if self.serializer.max_depth == 0 {
            anyhow::bail!("serializer.max_depth must be greater than 0");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.reviewgraph.db_path
    }
}
