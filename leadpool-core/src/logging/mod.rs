//! Process-wide logger built on the standard `log` crate
//!
//! Configure once at startup, then use `log::info!` and friends anywhere:
//!
//! ```rust,no_run
//! use leadpool_core::logging::{init_logging, LogFormat, LogOutput, LoggerConfig};
//!
//! let config = LoggerConfig::default()
//!     .with_format(LogFormat::Json)
//!     .with_output(LogOutput::Stderr)
//!     .with_context_field("service", "leadpool");
//! init_logging(&config).unwrap();
//!
//! log::info!("Listening on {}", "127.0.0.1:8080");
//! ```

pub mod formatter;

pub use formatter::{LogEntry, LogFormat};

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

/// Where entries are written
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Appended to, created along with its parent directory
    File(PathBuf),
}

#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub level: log::LevelFilter,
    pub format: LogFormat,
    pub outputs: Vec<LogOutput>,
    /// Added to every entry
    pub context_fields: BTreeMap<String, String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            format: LogFormat::Human,
            outputs: Vec::new(),
            context_fields: BTreeMap::new(),
        }
    }
}

impl LoggerConfig {
    pub fn with_level(mut self, level: log::LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_context_field(mut self, key: &str, value: &str) -> Self {
        self.context_fields.insert(key.to_string(), value.to_string());
        self
    }
}

/// Install the logger; later calls are no-ops
///
/// Errors opening a log file are reported on the first call only.
pub fn init_logging(config: &LoggerConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = install(config);
    });
    result
}

fn install(config: &LoggerConfig) -> anyhow::Result<()> {
    let logger = LeadpoolLogger::new(config.clone())?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(config.level);
    Ok(())
}

struct LeadpoolLogger {
    config: LoggerConfig,
    writers: Vec<Box<dyn LogWriter>>,
}

impl LeadpoolLogger {
    fn new(config: LoggerConfig) -> anyhow::Result<Self> {
        let mut writers: Vec<Box<dyn LogWriter>> = Vec::new();
        for output in &config.outputs {
            match output {
                LogOutput::Stdout => writers.push(Box::new(StdoutWriter)),
                LogOutput::Stderr => writers.push(Box::new(StderrWriter)),
                LogOutput::File(path) => writers.push(Box::new(FileWriter::open(path.clone())?)),
            }
        }
        if writers.is_empty() {
            writers.push(Box::new(StdoutWriter));
        }
        Ok(Self { config, writers })
    }
}

impl log::Log for LeadpoolLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.config.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry::from_record(record, &self.config.context_fields);
        let line = self.config.format.format_entry(&entry);
        for writer in &self.writers {
            let _ = writer.write_line(&line);
        }
    }

    fn flush(&self) {
        for writer in &self.writers {
            let _ = writer.flush();
        }
    }
}

trait LogWriter: Send + Sync {
    fn write_line(&self, line: &str) -> io::Result<()>;
    fn flush(&self) -> io::Result<()>;
}

struct StdoutWriter;

impl LogWriter for StdoutWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        writeln!(io::stdout().lock(), "{}", line)
    }

    fn flush(&self) -> io::Result<()> {
        io::stdout().flush()
    }
}

struct StderrWriter;

impl LogWriter for StderrWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{}", line)
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }
}

struct FileWriter {
    file: Mutex<BufWriter<File>>,
}

impl FileWriter {
    fn open(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { file: Mutex::new(BufWriter::new(file)) })
    }
}

impl LogWriter for FileWriter {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => {
                writeln!(file, "{}", line)?;
                file.flush()
            }
            Err(_) => Ok(()),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}
