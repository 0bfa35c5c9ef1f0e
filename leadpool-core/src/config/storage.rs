//! Storage configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Journal file replayed on startup; purely in-memory when unset
    /// Env: LP_JOURNAL_PATH (empty string disables)
    pub journal_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(path) = env::var("LP_JOURNAL_PATH") {
            self.journal_path = (!path.trim().is_empty()).then(|| PathBuf::from(path.trim()));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.journal_path {
            if path.is_dir() {
                bail!("journal_path {} is a directory", path.display());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_journal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig { journal_path: Some(dir.path().to_path_buf()) };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_file_journal_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig { journal_path: Some(dir.path().join("leadpool.journal")) };
        assert!(cfg.validate().is_ok());
    }
}
