use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entries kept before the oldest ones are dropped.
pub const DEFAULT_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// One advisory message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: LogKind,
}

/// Bounded, in-process log of advisory messages.
///
/// Every entry is mirrored to the `log` facade; errors at `error` level, the rest at `info`.
/// Nothing here feeds back into scheduling state.
#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DiagnosticLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            LogKind::Error => log::error!("{message}"),
            LogKind::Info | LogKind::Success => log::info!("{message}"),
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp,
            message,
            kind,
        });
    }

    pub fn info(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.push(timestamp, LogKind::Info, message);
    }

    pub fn success(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.push(timestamp, LogKind::Success, message);
    }

    pub fn error(&mut self, timestamp: DateTime<Utc>, message: impl Into<String>) {
        self.push(timestamp, LogKind::Error, message);
    }

    /// Oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memorizer_core::time::fixed_now;

    #[test]
    fn keeps_entries_in_order() {
        let mut log = DiagnosticLog::new();
        log.info(fixed_now(), "loaded");
        log.error(fixed_now(), "device lost");
        log.success(fixed_now(), "done");

        let kinds: Vec<_> = log.entries().map(|entry| entry.kind).collect();
        assert_eq!(kinds, vec![LogKind::Info, LogKind::Error, LogKind::Success]);
        assert_eq!(log.latest().unwrap().message, "done");
    }

    #[test]
    fn drops_oldest_beyond_capacity() {
        let mut log = DiagnosticLog::with_capacity(3);
        for i in 0..5 {
            log.info(fixed_now(), format!("m{i}"));
        }
        let messages: Vec<_> = log.entries().map(|entry| entry.message.as_str()).collect();
        assert_eq!(messages, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn entry_serializes_kind_as_type() {
        let entry = LogEntry {
            timestamp: fixed_now(),
            message: "hi".into(),
            kind: LogKind::Success,
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "success");
    }
}
