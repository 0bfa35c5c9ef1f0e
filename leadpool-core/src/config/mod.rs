//! Configuration for Leadpool
//!
//! # Configuration Hierarchy
//!
//! Values are resolved in the following order (highest priority wins):
//!
//! 1. **Code / CLI flags** - set on the struct after loading
//! 2. **Environment Variables** (`LP_*`) - override file config
//! 3. **Config File** (`leadpool.toml`) - override defaults
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use leadpool_core::config::LeadpoolConfig;
//!
//! let mut config = LeadpoolConfig::load()?;
//! config.server.port = 9090;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! A complete file:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [distribution]
//! batch_size = 10
//! high_priority_types = ["Restaurant", "Cafe", "Bar", "Hotel", "Salon", "Gym"]
//!
//! [storage]
//! journal_path = "./data/leadpool.journal"
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

pub mod distribution;
pub mod logging;
pub mod server;
pub mod storage;

pub use distribution::DistributionConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;
pub use storage::StorageConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "leadpool.toml";

/// Complete Leadpool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadpoolConfig {
    pub server: ServerConfig,
    pub distribution: DistributionConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl LeadpoolConfig {
    /// Defaults, then `leadpool.toml` if present, then environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.distribution.merge(other.distribution);
        self.storage.merge(other.storage);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.distribution.apply_env_vars();
        self.storage.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate().context("[server]")?;
        self.distribution.validate().context("[distribution]")?;
        self.storage.validate().context("[storage]")?;
        self.logging.validate().context("[logging]")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LeadpoolConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.distribution.batch_size, 10);
        assert!(config.storage.journal_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leadpool.toml");
        std::fs::write(
            &path,
            "[distribution]\nbatch_size = 25\n\n[logging]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = LeadpoolConfig::load_from(&path).unwrap();
        assert_eq!(config.distribution.batch_size, 25);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.distribution.high_priority_types.len(), 6);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = LeadpoolConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leadpool.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        let err = LeadpoolConfig::load_from(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load config"));
    }

    #[test]
    fn test_validation_names_section() {
        let mut config = LeadpoolConfig::default();
        config.distribution.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("[distribution]"));
    }
}
