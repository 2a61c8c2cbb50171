//! Run event log
//!
//! Append-only record of one run: every command and reply, every skipped
//! line or file, every snapshot. The run summary is computed from it and
//! `--events` writes it out as JSON lines.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::runner::SessionState;

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Monotonic sequence ID
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    CommandSent {
        command: String,
    },
    ReplyReceived {
        reply: String,
    },
    LineSkipped {
        line: usize,
        token: String,
        reason: String,
    },
    FileSkipped {
        line: usize,
        file: String,
        reason: String,
    },
    SnapshotSaved {
        line: usize,
        filename: String,
        grouped: bool,
    },
    RunCompleted {
        lines: usize,
        snapshots: usize,
        duration_ms: u64,
    },
    RunAborted {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventLog {
    events: Vec<Event>,
    started: Instant,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Append an event, returning its id
    pub fn push(&mut self, kind: EventKind) -> u64 {
        let id = self.events.len() as u64;
        self.events.push(Event {
            id,
            timestamp_ms: self.started.elapsed().as_millis() as u64,
            kind,
        });
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn snapshots(&self) -> impl Iterator<Item = (&str, bool)> {
        self.events.iter().filter_map(|e| match &e.kind {
            EventKind::SnapshotSaved {
                filename, grouped, ..
            } => Some((filename.as_str(), *grouped)),
            _ => None,
        })
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots().count()
    }

    pub fn skipped_lines(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::LineSkipped { .. }))
            .count()
    }

    /// Distinct `(line, file)` pairs; a file refused for both the group
    /// and the single photo counts once
    pub fn skipped_files(&self) -> usize {
        self.events
            .iter()
            .filter_map(|e| match &e.kind {
                EventKind::FileSkipped { line, file, .. } => Some((*line, file.as_str())),
                _ => None,
            })
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn write_json_lines(&self, path: &Path) -> Result<()> {
        let body = self.to_json_lines().map_err(std::io::Error::from)?;
        fs::write(path, body)?;
        Ok(())
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
