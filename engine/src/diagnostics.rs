//! Bounded diagnostic log.
//!
//! A fixed-capacity FIFO of human-readable operation lines, owned by the
//! session context and read by the front end for display. It is not an error
//! channel: failures show up here as `Error:` lines and nowhere else.

use std::collections::VecDeque;

/// Default number of lines kept.
pub const CMD_LOG_MAX: usize = 5;

#[derive(Debug, Clone)]
pub struct DiagnosticLog {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::with_capacity(CMD_LOG_MAX)
    }

    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        DiagnosticLog {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "twinsync::diagnostics", "{}", line);
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Lines from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The `n` most recent lines, oldest first.
    pub fn latest(&self, n: usize) -> Vec<&str> {
        let skip = self.lines.len().saturating_sub(n);
        self.entries().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for DiagnosticLog {
    fn default() -> Self {
        Self::new()
    }
}
