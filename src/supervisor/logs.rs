//! Bounded in-memory capture of worker output.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Serialize;

/// Which worker stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// One captured line of worker output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    pub stream: LogStream,
    pub line: String,
}

/// Ring buffer over the worker's stdout/stderr lines.
///
/// Oldest lines are evicted first once capacity is reached. The buffer
/// survives worker restarts within one application run; it is cleared
/// only at application teardown.
pub struct LogBuffer {
    capacity: usize,
    lines: Mutex<VecDeque<LogLine>>,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a line, evicting the oldest entry on overflow.
    pub fn push(&self, stream: LogStream, line: String) {
        if self.capacity == 0 {
            return;
        }
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(LogLine { stream, line });
    }

    /// Last `limit` lines in arrival order. `None` returns the full buffer.
    pub fn tail(&self, limit: Option<usize>) -> Vec<LogLine> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        let limit = limit.unwrap_or(self.capacity).min(lines.len());
        lines.iter().skip(lines.len() - limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all captured lines. Application teardown only.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}
