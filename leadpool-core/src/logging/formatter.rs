//! Log entry rendering

use serde_json::Value;
use std::collections::BTreeMap;

/// How entries are rendered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `2024-01-15 10:30:00.000 INFO  [leadpool_core::service] message key=value`
    Human,
    /// One JSON object per line
    Json,
    /// `level=INFO target=... message="..."`
    Logfmt,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(LogFormat::Human),
            "json" => Ok(LogFormat::Json),
            "logfmt" => Ok(LogFormat::Logfmt),
            other => Err(format!("unknown log format: '{}'", other)),
        }
    }
}

/// A structured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: log::Level,
    pub message: String,
    pub target: String,
    /// Static context fields, sorted for stable output
    pub fields: BTreeMap<String, Value>,
    /// `file:line` when known
    pub location: Option<String>,
}

impl LogEntry {
    pub fn new(level: log::Level, message: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
            target: target.into(),
            fields: BTreeMap::new(),
            location: None,
        }
    }

    pub fn from_record(record: &log::Record, context: &BTreeMap<String, String>) -> Self {
        let mut entry = Self::new(record.level(), record.args().to_string(), record.target());
        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            entry.location = Some(format!("{}:{}", file, line));
        }
        for (key, value) in context {
            entry.fields.insert(key.clone(), Value::String(value.clone()));
        }
        entry
    }

    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }
}

impl LogFormat {
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        match self {
            LogFormat::Json => format_json(entry),
            LogFormat::Human => format_human(entry),
            LogFormat::Logfmt => format_logfmt(entry),
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_json(entry: &LogEntry) -> String {
    let mut json = serde_json::Map::new();
    json.insert("timestamp".to_string(), Value::String(entry.timestamp.to_rfc3339()));
    json.insert("level".to_string(), Value::String(entry.level.to_string()));
    json.insert("message".to_string(), Value::String(entry.message.clone()));
    json.insert("target".to_string(), Value::String(entry.target.clone()));
    if let Some(location) = &entry.location {
        json.insert("location".to_string(), Value::String(location.clone()));
    }
    for (key, value) in &entry.fields {
        json.insert(key.clone(), value.clone());
    }
    serde_json::to_string(&json).unwrap_or_else(|_| entry.message.clone())
}

fn format_human(entry: &LogEntry) -> String {
    let mut line = format!(
        "{} {:5} [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.level,
        entry.target,
        entry.message
    );
    for (key, value) in &entry.fields {
        line.push_str(&format!(" {}={}", key, plain(value)));
    }
    line
}

fn format_logfmt(entry: &LogEntry) -> String {
    let quote = |s: &str| format!("\"{}\"", s.replace('"', "\\\""));
    let mut parts = vec![
        format!("timestamp={}", entry.timestamp.to_rfc3339()),
        format!("level={}", entry.level),
        format!("target={}", entry.target),
        format!("message={}", quote(&entry.message)),
    ];
    if let Some(location) = &entry.location {
        parts.push(format!("location={}", quote(location)));
    }
    for (key, value) in &entry.fields {
        let rendered = match value {
            Value::Number(_) | Value::Bool(_) => value.to_string(),
            other => quote(&plain(other)),
        };
        parts.push(format!("{}={}", key, rendered));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let entry = LogEntry::new(log::Level::Info, "Replenished tm-1", "leadpool_core::distribution");
        let parsed: Value = serde_json::from_str(&LogFormat::Json.format_entry(&entry)).unwrap();
        assert_eq!(parsed["message"], "Replenished tm-1");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["target"], "leadpool_core::distribution");
    }

    #[test]
    fn test_human_format_appends_fields() {
        let entry = LogEntry::new(log::Level::Warn, "Notification failed", "leadpool_core::service")
            .with_field("service", Value::String("leadpool".to_string()));
        let formatted = LogFormat::Human.format_entry(&entry);
        assert!(formatted.contains("WARN"));
        assert!(formatted.contains("[leadpool_core::service] Notification failed"));
        assert!(formatted.ends_with("service=leadpool"));
    }

    #[test]
    fn test_logfmt_quotes_messages() {
        let entry = LogEntry::new(log::Level::Debug, "said \"hi\"", "t")
            .with_field("port", Value::from(8080));
        let formatted = LogFormat::Logfmt.format_entry(&entry);
        assert!(formatted.contains("level=DEBUG"));
        assert!(formatted.contains("message=\"said \\\"hi\\\"\""));
        assert!(formatted.contains("port=8080"));
    }

    #[test]
    fn test_parse_format_names() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
