// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Logging infrastructure for the IoT SDK
//!
//! Each engine (SNAP, trust list, firmware, services) owns a small ring of
//! formatted records. Records are stamped with the engine's tick counter
//! rather than wall-clock time, and the oldest record is evicted when the
//! ring is full.
//!
//! Key material must never be logged.

use core::fmt::{self, Write};
use heapless::{Deque, String};

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 96;

/// Default ring capacity (number of records)
pub const LOG_RING_SIZE: usize = 16;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that abort an operation
    Error = 0,
    /// Recoverable anomalies (dropped frames, retries)
    Warn = 1,
    /// State changes worth keeping
    Info = 2,
    /// Protocol-level detail
    Debug = 3,
    /// Per-frame detail
    Trace = 4,
}

impl LogLevel {
    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single formatted log record
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// Log level
    pub level: LogLevel,
    /// Engine tick at which the record was produced
    pub tick: u32,
    /// Component that produced the record
    pub source: &'static str,
    /// Formatted message, truncated to [`MAX_LOG_MESSAGE_LEN`]
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8} {:<5} {}: {}", self.tick, self.level, self.source, self.message)
    }
}

/// Writer that silently truncates at capacity instead of failing
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Bounded log ring
pub struct LogBuffer<const N: usize = LOG_RING_SIZE> {
    records: Deque<LogRecord, N>,
    min_level: LogLevel,
    dropped: u32,
}

impl<const N: usize> LogBuffer<N> {
    /// Create an empty ring that keeps `Info` and above
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Deque::new(),
            min_level: LogLevel::Info,
            dropped: 0,
        }
    }

    /// Set the most verbose level that is still recorded
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level <= self.min_level
    }

    /// Format and record a message
    pub fn log(&mut self, level: LogLevel, tick: u32, source: &'static str, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        if self.records.is_full() {
            self.records.pop_front();
            self.dropped = self.dropped.wrapping_add(1);
        }
        // Cannot fail: a slot was freed above.
        let _ = self.records.push_back(LogRecord { level, tick, source, message });
    }

    /// Number of records currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the ring is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records evicted since creation
    #[must_use]
    pub const fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Most recent record
    #[must_use]
    pub fn last(&self) -> Option<&LogRecord> {
        self.records.back()
    }

    /// Check whether any held record contains `needle`
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.records.iter().any(|r| r.message.contains(needle))
    }

    /// Iterate over records, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<const N: usize> Default for LogBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Record an error
#[macro_export]
macro_rules! log_error {
    ($logs:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $logs.log($crate::log::LogLevel::Error, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a warning
#[macro_export]
macro_rules! log_warn {
    ($logs:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $logs.log($crate::log::LogLevel::Warn, $tick, $source, format_args!($($arg)*))
    };
}

/// Record an informational message
#[macro_export]
macro_rules! log_info {
    ($logs:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $logs.log($crate::log::LogLevel::Info, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a debug message
#[macro_export]
macro_rules! log_debug {
    ($logs:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $logs.log($crate::log::LogLevel::Debug, $tick, $source, format_args!($($arg)*))
    };
}

/// Record a trace message
#[macro_export]
macro_rules! log_trace {
    ($logs:expr, $tick:expr, $source:expr, $($arg:tt)*) => {
        $logs.log($crate::log::LogLevel::Trace, $tick, $source, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let mut logs: LogBuffer<4> = LogBuffer::new();
        crate::log_debug!(logs, 1, "test", "hidden {}", 1);
        crate::log_warn!(logs, 2, "test", "shown {}", 2);
        assert_eq!(logs.len(), 1);
        assert!(logs.contains("shown 2"));
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let mut logs: LogBuffer<2> = LogBuffer::new();
        for i in 0..5u32 {
            crate::log_info!(logs, i, "test", "record {}", i);
        }
        assert_eq!(logs.len(), 2);
        assert_eq!(logs.dropped(), 3);
        assert_eq!(logs.last().map(|r| r.tick), Some(4));
        assert!(!logs.contains("record 2"));
    }

    #[test]
    fn test_long_message_truncated() {
        let mut logs: LogBuffer<1> = LogBuffer::new();
        let long = [b'x'; 200];
        let text = core::str::from_utf8(&long).unwrap();
        crate::log_error!(logs, 0, "test", "{}", text);
        assert_eq!(logs.last().unwrap().message.len(), MAX_LOG_MESSAGE_LEN);
    }
}
