//! Console/file output sink.
//!
//! The simulated machine's log is not `tracing` output — it is the product the
//! simulation exists to produce, one line per event, optionally mirrored to a
//! file. Threaded through the driver loop as an owned capability object
//! rather than process-wide global state.

use crate::config::LogTo;
use crate::timer::SimClock;
use std::fs;
use std::io::{self, Write as _};
use std::path::Path;

/// Destination flags plus the in-memory buffer mirrored to a log file.
#[derive(Debug, Default)]
pub struct OutputSink {
    console: bool,
    file: bool,
    buffer: Vec<String>,
}

impl OutputSink {
    /// Creates a sink with both destinations disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets console/file destinations from a configuration's `Log To` selection.
    pub fn configure(&mut self, log_to: LogTo) {
        self.console = matches!(log_to, LogTo::Monitor | LogTo::Both);
        self.file = matches!(log_to, LogTo::File | LogTo::Both);
    }

    /// Writes `message` prefixed with the clock's current lap time.
    pub fn log(&mut self, clock: &SimClock, message: &str) {
        let line = format!("{:>10}, {message}", clock.lap());
        self.emit(&line);
    }

    /// Writes `message` with no timestamp prefix (memory-display blocks, the
    /// blank line between process selections).
    pub fn raw(&mut self, message: &str) {
        self.emit(message);
    }

    /// Writes a bare newline, matching `output.c`'s `outputNewline`.
    pub fn blank(&mut self) {
        self.emit("");
    }

    fn emit(&mut self, line: &str) {
        if self.console {
            println!("{line}");
        }
        if self.file {
            self.buffer.push(line.to_string());
        }
    }

    /// Flushes the buffered lines to `path`, one per line, if file logging is
    /// enabled. No-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be created or
    /// written.
    pub fn flush_to_file(&self, path: &Path) -> io::Result<()> {
        if !self.file {
            return Ok(());
        }
        let mut out = fs::File::create(path)?;
        for line in &self.buffer {
            writeln!(out, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_monitor_enables_console_only() {
        let mut sink = OutputSink::new();
        sink.configure(LogTo::Monitor);
        assert!(sink.console);
        assert!(!sink.file);
    }

    #[test]
    fn configure_both_enables_console_and_file() {
        let mut sink = OutputSink::new();
        sink.configure(LogTo::Both);
        assert!(sink.console);
        assert!(sink.file);
    }

    #[test]
    fn configure_file_enables_file_only() {
        let mut sink = OutputSink::new();
        sink.configure(LogTo::File);
        assert!(!sink.console);
        assert!(sink.file);
    }

    #[test]
    fn raw_and_log_buffer_when_file_enabled() {
        let mut sink = OutputSink::new();
        sink.configure(LogTo::File);
        let clock = SimClock::new();
        sink.log(&clock, "OS: Simulator start");
        sink.raw("No timestamp here");
        assert_eq!(sink.buffer.len(), 2);
        assert!(sink.buffer[0].ends_with("OS: Simulator start"));
        assert_eq!(sink.buffer[1], "No timestamp here");
    }

    #[test]
    fn flush_writes_buffered_lines_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let mut sink = OutputSink::new();
        sink.configure(LogTo::File);
        sink.raw("line one");
        sink.raw("line two");
        sink.flush_to_file(&path).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "line one\nline two\n");
    }

    #[test]
    fn flush_is_noop_when_file_logging_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.log");
        let mut sink = OutputSink::new();
        sink.configure(LogTo::Monitor);
        sink.flush_to_file(&path).unwrap();
        assert!(!path.exists());
    }
}
