//! Output sinks - line-oriented destinations for interpreter output.
//!
//! The interpreter writes to two logically distinct streams: the *log*
//! (NOTE/WARNING/ERROR diagnostics, step timings) and the *list* (PROC
//! PRINT tables, titles, procedure results). Both are plain line sinks so
//! the REPL, batch driver and tests can each route them where they want.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// A line-oriented output destination.
pub trait LineSink {
    /// Write one line (no trailing newline in `line`).
    fn write_line(&mut self, line: &str);
}

/// Sink that writes to stdout or stderr.
pub struct ConsoleSink {
    use_stderr: bool,
}

impl ConsoleSink {
    /// Sink on standard output (the usual list destination).
    pub fn stdout() -> Self {
        Self { use_stderr: false }
    }

    /// Sink on standard error (the usual log destination).
    pub fn stderr() -> Self {
        Self { use_stderr: true }
    }
}

impl LineSink for ConsoleSink {
    fn write_line(&mut self, line: &str) {
        // Output failure must not take the interpreter down mid-program.
        if self.use_stderr {
            let _ = writeln!(std::io::stderr(), "{line}");
        } else {
            let _ = writeln!(std::io::stdout(), "{line}");
        }
    }
}

/// In-memory sink, shared and inspectable. Used by tests and the REPL.
#[derive(Clone, Default)]
pub struct MemorySink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    /// True if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }

    /// Drop captured lines.
    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl LineSink for MemorySink {
    fn write_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_lines() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_line("NOTE: step ran");
        writer.write_line("x = 42");

        assert_eq!(sink.lines().len(), 2);
        assert!(sink.contains("step ran"));
        assert!(!sink.contains("missing"));
    }

    #[test]
    fn test_memory_sink_clear() {
        let sink = MemorySink::new();
        sink.clone().write_line("line");
        sink.clear();
        assert!(sink.lines().is_empty());
    }
}
