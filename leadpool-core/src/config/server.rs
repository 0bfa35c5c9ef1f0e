//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listening port
    /// Env: LP_PORT
    /// Default: 8080
    pub port: u16,

    /// Server listening address
    /// Env: LP_HOST
    /// Default: "127.0.0.1"
    pub host: String,

    /// Number of Tokio worker threads
    /// Env: LP_WORKERS
    /// Default: one per core
    pub workers: Option<usize>,

    /// Maximum request body size in bytes
    /// Env: LP_MAX_BODY_SIZE
    /// Default: 1048576 (1MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            workers: None,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        self.port = other.port;
        self.host = other.host;
        self.workers = other.workers;
        self.max_body_size = other.max_body_size;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(port) = env::var("LP_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(host) = env::var("LP_HOST") {
            self.host = host;
        }

        if let Ok(workers) = env::var("LP_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.workers = Some(w);
            }
        }

        if let Ok(size) = env::var("LP_MAX_BODY_SIZE") {
            if let Ok(s) = size.parse() {
                self.max_body_size = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }
        if self.workers == Some(0) {
            bail!("Invalid workers: must be at least 1");
        }
        if self.max_body_size == 0 {
            bail!("Invalid max_body_size: must be greater than 0");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
