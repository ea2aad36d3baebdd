//! A simple JSONL-backed append-only log, used to persist each history
//! stream to disk. Reading is always a full scan: these logs are
//! write-heavy and read rarely, and a decision's history is bounded by
//! its lifetime, not by system-wide volume.

use decivue_core::ids::next_monotonic_id;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Monotonic id assigned to each appended record, local to one log file.
pub type EventId = u64;

/// Errors emitted by [`HistoryLog`].
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialize: {0}")]
    Serde(#[from] serde_json::Error),
}

/// One persisted record plus the envelope metadata the log assigns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: EventId,
    pub payload: T,
}

/// An append-only, JSONL-backed log of one record type.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: String,
}

impl HistoryLog {
    /// Create or open a log at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HistoryError> {
        let p = path.as_ref();
        if !p.exists() {
            OpenOptions::new().create(true).write(true).truncate(true).open(p)?;
        }
        Ok(Self { path: p.to_string_lossy().into_owned() })
    }

    /// Append a record, assigning it the next monotonic id.
    pub fn append<T: Serialize>(&self, payload: &T) -> Result<EventId, HistoryError> {
        let id = next_monotonic_id();
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let line = serde_json::to_string(&Envelope { id, payload })?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(id)
    }

    /// Read every record in the log, in append order.
    pub fn read_all<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, HistoryError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let env: Envelope<T> = serde_json::from_str(&line)?;
            out.push(env.payload);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_roundtrip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let log = HistoryLog::open(tmp.path()).unwrap();
        log.append(&"hello".to_string()).unwrap();
        log.append(&"world".to_string()).unwrap();
        let got: Vec<String> = log.read_all().unwrap();
        assert_eq!(got, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn ids_are_monotonic_across_appends() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let log = HistoryLog::open(tmp.path()).unwrap();
        let a = log.append(&1u32).unwrap();
        let b = log.append(&2u32).unwrap();
        assert!(b > a);
    }
}
