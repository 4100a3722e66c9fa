//! Node configuration.

use crate::Args;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network (main, test, regtest).
    pub network: String,
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enforce hard-coded checkpoints. Always on for the main network.
    #[serde(default = "default_true")]
    pub checkpoints_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl NodeConfig {
    /// Load configuration from file and CLI args.
    pub fn load(config_path: &Path, args: &Args) -> Result<Self> {
        let mut config = if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            Self::default_for_network(args.network.as_deref().unwrap_or("main"))
        };

        // Only override if explicitly provided via CLI
        if let Some(ref network) = args.network {
            config.network = network.clone();
        }
        if let Some(ref log_level) = args.log_level {
            config.log_level = log_level.clone();
        }
        if args.no_checkpoints {
            config.checkpoints_enabled = false;
        }

        Ok(config)
    }

    /// Create default config for a network.
    pub fn default_for_network(network: &str) -> Self {
        Self {
            network: network.to_string(),
            log_level: default_log_level(),
            checkpoints_enabled: true,
        }
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
