//! Append-only emergency event log.
//!
//! The side channel for events that could not enter the primary queue. One
//! serialized [`TimerEvent`] per line. Recovery reads the file line by line,
//! skipping (and counting) lines that no longer parse, then renames the file
//! with a timestamped `.recovered.<ts>.bak` suffix -- an audit trail survives,
//! and a rename racing a fresh append cannot destroy data the way a delete
//! would.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::{Result, StorageError};
use crate::timer::event::TimerEvent;

/// Outcome of one recovery pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoverySummary {
    /// Events successfully parsed and handed back for re-submission.
    pub recovered: Vec<TimerEvent>,
    /// Lines that failed to parse and were skipped.
    pub malformed_lines: usize,
    /// Where the consumed file was archived, if it existed.
    pub archived_to: Option<PathBuf>,
}

/// Per-tenant emergency log handle.
#[derive(Debug, Clone)]
pub struct EmergencyLog {
    path: PathBuf,
}

impl EmergencyLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event as a single JSON line.
    ///
    /// # Errors
    /// Returns an error if the event cannot be serialized or the line cannot
    /// be written. Callers treat that as the catastrophic-loss case and must
    /// log the full payload at ERROR severity.
    pub fn append(&self, event: &TimerEvent) -> Result<()> {
        let line = serde_json::to_string(event).map_err(|e| StorageError::AppendFailed {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::AppendFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        writeln!(file, "{line}").map_err(|e| {
            StorageError::AppendFailed {
                path: self.path.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Drain the log: parse every line, archive the file, return the events.
    ///
    /// A missing or empty file yields an empty summary. Individual lines
    /// that fail to parse are counted and skipped, never fatal to the batch.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read, or the
    /// archival rename fails.
    pub fn recover(&self) -> Result<RecoverySummary> {
        let mut summary = RecoverySummary::default();
        if !self.path.exists() {
            return Ok(summary);
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| StorageError::LoadFailed {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TimerEvent>(line) {
                Ok(event) => summary.recovered.push(event),
                Err(e) => {
                    summary.malformed_lines += 1;
                    tracing::warn!(error = %e, "Skipping malformed emergency log line");
                }
            }
        }

        if summary.recovered.is_empty() && summary.malformed_lines == 0 {
            return Ok(summary);
        }

        let archived = self.archive_path();
        std::fs::rename(&self.path, &archived).map_err(|source| StorageError::ArchiveFailed {
            path: self.path.clone(),
            source,
        })?;
        summary.archived_to = Some(archived);
        Ok(summary)
    }

    fn archive_path(&self) -> PathBuf {
        let ts = Utc::now().format("%Y%m%d%H%M%S%3f");
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "emergency_events.jsonl".to_string());
        name.push_str(&format!(".recovered.{ts}.bak"));
        self.path.with_file_name(name)
    }
}
