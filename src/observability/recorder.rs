//! JSONL recorder for relayed writes
//!
//! Format: one [`EventRecord`] per line, appended as events arrive.

use chrono::{Local, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::ObserverError;
use crate::event::{Channel, RedirectEvent};
use crate::observer::{Observer, SinkId};

/// A recorded write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Timestamp (UTC RFC 3339)
    pub timestamp: String,
    /// Local time for display
    pub local_time: String,
    /// Dispatching sink
    pub sink: u64,
    pub channel: Channel,
    pub text: String,
}

impl EventRecord {
    pub fn from_event(source: SinkId, event: &RedirectEvent) -> Self {
        let now = Utc::now();
        let local = Local::now();

        Self {
            timestamp: now.to_rfc3339(),
            local_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            sink: source.get(),
            channel: event.channel(),
            text: event.text().to_string(),
        }
    }

    /// Rebuild the event as observers saw it, e.g. to decode its payload
    pub fn to_event(&self) -> RedirectEvent {
        RedirectEvent::new(self.channel, self.text.clone())
    }
}

/// Appends every event to a JSONL file
pub struct Recorder {
    path: PathBuf,
    file: File,
}

impl Recorder {
    /// Open `path` for appending, creating parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context(format!("Failed to create {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("Failed to open recording {}", path.display()))?;

        log::info!("Recording relayed output to {}", path.display());
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Observer for Recorder {
    fn notify(&mut self, source: SinkId, event: &mut RedirectEvent) -> Result<(), ObserverError> {
        let record = EventRecord::from_event(source, event);
        let json = serde_json::to_string(&record)?;
        writeln!(self.file, "{}", json)?;
        Ok(())
    }
}

/// Read every record from a recording, in write order
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<EventRecord>> {
    let path = path.as_ref();
    let file = File::open(path).context(format!("Failed to open recording {}", path.display()))?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.context("Failed to read recording")?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EventRecord = serde_json::from_str(&line)
            .context(format!("Malformed record at {}:{}", path.display(), index + 1))?;
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RedirectSink;
    use tempfile::TempDir;

    #[test]
    fn test_record_then_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("run.jsonl");

        let mut sink = RedirectSink::new(Recorder::open(&path).unwrap());
        sink.write_text("partial").unwrap();
        sink.write_line("done").unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].channel, Channel::Write);
        assert_eq!(records[0].text, "partial");
        assert_eq!(records[1].channel, Channel::WriteLine);
        assert_eq!(records[1].text, "done");
        assert_eq!(records[1].sink, sink.id().get());
    }

    #[test]
    fn test_recorder_appends() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.jsonl");

        for text in ["one", "two"] {
            let mut sink = RedirectSink::new(Recorder::open(&path).unwrap());
            sink.write_line(text).unwrap();
        }

        let texts: Vec<_> = read_records(&path).unwrap().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.jsonl");
        let line = r#"{"timestamp":"2026-01-03T12:00:00Z","local_time":"2026-01-03 12:00:00","sink":1,"channel":"write_line","text":"hi"}"#;
        fs::write(&path, format!("{line}\n\n{line}\n")).unwrap();

        assert_eq!(read_records(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_read_reports_malformed_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("run.jsonl");
        fs::write(&path, "not json\n").unwrap();

        let err = read_records(&path).unwrap_err();
        assert!(format!("{err:#}").contains(":1"));
    }

    #[test]
    fn test_record_to_event_decodes() {
        let record = EventRecord {
            timestamp: "2026-01-03T12:00:00Z".to_string(),
            local_time: "2026-01-03 12:00:00".to_string(),
            sink: 1,
            channel: Channel::WriteLine,
            text: r#"{"id":1}"#.to_string(),
        };

        let value: serde_json::Value = record.to_event().decode_as().unwrap();
        assert_eq!(value, serde_json::json!({"id": 1}));
        assert!(!record.to_event().is_consumed());
    }
}
