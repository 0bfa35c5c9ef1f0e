//! Logging configuration

use crate::logging::{LogFormat, LogOutput, LoggerConfig};
use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// error | warn | info | debug | trace | off
    /// Env: LP_LOG_LEVEL
    pub level: String,
    /// human | json | logfmt
    /// Env: LP_LOG_FORMAT
    pub format: String,
    /// stdout | stderr | file
    /// Env: LP_LOG_OUTPUT
    pub output: String,
    /// Required when output is "file"
    /// Env: LP_LOG_FILE
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "human".to_string(),
            output: "stdout".to_string(),
            file_path: None,
        }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("LP_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(format) = env::var("LP_LOG_FORMAT") {
            self.format = format;
        }
        if let Ok(output) = env::var("LP_LOG_OUTPUT") {
            self.output = output;
        }
        if let Ok(path) = env::var("LP_LOG_FILE") {
            self.file_path = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.logger_config().map(|_| ())
    }

    /// Settings for [`crate::logging::init_logging`]
    pub fn logger_config(&self) -> Result<LoggerConfig> {
        let level: log::LevelFilter = self
            .level
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid log level: '{}'", self.level))?;
        let format: LogFormat = self.format.parse().map_err(|e: String| anyhow!(e))?;
        let output = match self.output.trim().to_ascii_lowercase().as_str() {
            "stdout" => LogOutput::Stdout,
            "stderr" => LogOutput::Stderr,
            "file" => match &self.file_path {
                Some(path) => LogOutput::File(path.clone()),
                None => bail!("Log output 'file' requires file_path"),
            },
            other => bail!("Invalid log output: '{}'", other),
        };

        Ok(LoggerConfig::default()
            .with_level(level)
            .with_format(format)
            .with_output(output)
            .with_context_field("service", "leadpool"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_config() {
        let logger = LoggingConfig::default().logger_config().unwrap();
        assert_eq!(logger.level, log::LevelFilter::Info);
        assert_eq!(logger.format, LogFormat::Human);
        assert_eq!(logger.outputs, vec![LogOutput::Stdout]);
    }

    #[test]
    fn test_file_output_needs_path() {
        let cfg = LoggingConfig { output: "file".to_string(), ..Default::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("file_path"));

        let cfg = LoggingConfig {
            output: "file".to_string(),
            file_path: Some(PathBuf::from("./logs/leadpool.log")),
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_bad_level_and_format_rejected() {
        let cfg = LoggingConfig { level: "loud".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = LoggingConfig { format: "xml".to_string(), ..Default::default() };
        assert!(cfg.validate().unwrap_err().to_string().contains("unknown log format"));
    }
}
