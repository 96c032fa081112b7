//! Configuration file support for the CLI.
//!
//! Loads CLI configuration from TOML files.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use stow_store::{ProvisionPolicy, StoreConfig};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Database connection descriptor.
    #[serde(default = "default_database")]
    pub database: String,

    /// Default output format.
    #[serde(default = "default_format")]
    pub output_format: String,

    /// Lock wait in milliseconds.
    #[serde(default)]
    pub busy_timeout_ms: Option<u64>,

    /// Which failures provision a collection.
    #[serde(default)]
    pub provision_policy: ProvisionPolicy,
}

fn default_database() -> String {
    "stow.db".to_string()
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            output_format: default_format(),
            busy_timeout_ms: None,
            provision_policy: ProvisionPolicy::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the default configuration file.
    ///
    /// Looks in the following locations:
    /// 1. ~/.config/stow/config.toml
    /// 2. ~/.stow/config.toml
    /// 3. Returns default if not found
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".stow").join("config.toml");
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stow").join("config.toml"))
    }

    /// Builds the store configuration this CLI configuration describes.
    pub fn store_config(&self) -> StoreConfig {
        let mut builder = StoreConfig::builder()
            .conn(self.database.clone())
            .provision_policy(self.provision_policy);
        if let Some(ms) = self.busy_timeout_ms {
            builder = builder.busy_timeout_ms(ms);
        }
        builder.build()
    }
}
