//! Append-only journal for the embedded datastore
//!
//! # File Format
//!
//! One event per line, prefixed with its CRC32:
//!
//! ```text
//! 1a2b3c4d:{"event":"LeadUpserted","data":{...}}
//! ```
//!
//! Only primary collections are journaled. The inventory snapshot and the
//! performance records are derived, so they are rebuilt by a recompute after
//! replay instead of being persisted.

use crate::model::{Booking, EmailEntry, Lead, Notification, User};
use crate::{Error, Result};
use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[inline]
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Format: "<crc32_hex>:<json>"
#[inline]
pub fn format_line(json: &str) -> String {
    format!("{:08x}:{}", calculate_crc32(json.as_bytes()), json)
}

/// Returns the JSON payload of a line, or why it was rejected
pub fn parse_and_validate_line(line: &str) -> std::result::Result<&str, String> {
    if line.len() <= 9 || line.as_bytes()[8] != b':' {
        return Err("missing CRC32 prefix".to_string());
    }
    let (crc_hex, json) = line.split_at(9);
    let expected = u32::from_str_radix(&crc_hex[..8], 16)
        .map_err(|_| format!("invalid CRC32 hex: {}", &crc_hex[..8]))?;
    let actual = calculate_crc32(json.as_bytes());
    if expected != actual {
        return Err(format!("CRC32 mismatch: expected {:08x}, got {:08x}", expected, actual));
    }
    Ok(json)
}

/// A mutation of a primary collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum StoreEvent {
    LeadUpserted(Lead),
    LeadDeleted { id: String },
    UserUpserted(User),
    BookingAppended(Booking),
    NotificationAppended(Notification),
    EmailAppended(EmailEntry),
}

/// Line-oriented event log, flushed on every append
pub struct Journal {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal").field("path", &self.path).finish()
    }
}

impl Journal {
    /// Open for appending, creating the file and its parent directory
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: Mutex::new(BufWriter::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &StoreEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Dependency("journal writer lock poisoned".to_string()))?;
        writeln!(writer, "{}", format_line(&json))?;
        writer.flush()?;
        Ok(())
    }

    /// Read every valid event in file order
    ///
    /// Corrupted lines are skipped and logged; a torn last line after a
    /// crash is the common case.
    pub fn replay(path: impl AsRef<Path>) -> Result<Vec<StoreEvent>> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No journal at {}, starting empty", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path)?;
        let mut events = Vec::new();
        let mut rejected = 0usize;
        for (line_num, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = parse_and_validate_line(line).and_then(|json| {
                serde_json::from_str::<StoreEvent>(json).map_err(|e| e.to_string())
            });
            match parsed {
                Ok(event) => events.push(event),
                Err(e) => {
                    rejected += 1;
                    log::warn!("Skipping journal line {}:{}: {}", path.display(), line_num + 1, e);
                }
            }
        }

        if rejected > 0 {
            log::warn!("Replayed {} events, {} corrupted lines rejected", events.len(), rejected);
        } else {
            log::info!("Replayed {} events from {}", events.len(), path.display());
        }
        Ok(events)
    }
}
