//! JSONL journal of rig events.
//!
//! Records what changed the rig's behaviour: startup, accepted and ignored
//! speed commands, sensor faults and shutdown. Per-cycle records are not
//! journaled; they belong to the host's CSV log.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventType {
    SystemStart,
    CommandAccepted,
    CommandIgnored,
    SensorFault,
    SystemShutdown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic timestamp in microseconds
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: JournalEventType,
    pub details: serde_json::Value,
}

/// Append-only JSONL writer; safe to share between threads.
pub struct EventJournal {
    writer: Mutex<BufWriter<File>>,
}

impl EventJournal {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn log(&self, entry: &JournalEntry) -> std::io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| std::io::Error::other("journal lock poisoned"))?;
        serde_json::to_writer(&mut *writer, entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn log_event(
        &self,
        timestamp_us: u64,
        unix_us: u64,
        event_type: JournalEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(&JournalEntry {
            timestamp_us,
            unix_us,
            event_type,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_jsonl_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events").join("rig.jsonl");

        let journal = EventJournal::open(&path).unwrap();
        journal
            .log_event(
                10,
                1704067200000000,
                JournalEventType::SystemStart,
                serde_json::json!({"version": "0.1.0"}),
            )
            .unwrap();
        journal
            .log_event(
                20,
                1704067200000010,
                JournalEventType::CommandIgnored,
                serde_json::json!({"raw": "5000", "reason": "speed 5000 outside [100, 1200]"}),
            )
            .unwrap();
        drop(journal);

        // Reopening appends instead of truncating.
        let journal = EventJournal::open(&path).unwrap();
        journal
            .log_event(
                30,
                1704067200000020,
                JournalEventType::SystemShutdown,
                serde_json::json!({}),
            )
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<JournalEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].event_type, JournalEventType::CommandIgnored);
        assert_eq!(entries[1].details["raw"], "5000");
        assert_eq!(entries[2].timestamp_us, 30);
    }
}
