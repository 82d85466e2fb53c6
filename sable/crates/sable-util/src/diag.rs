//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Diagnostics are collected in a [`Handler`] shared by the lexer, parser
//! and executor. The handler uses interior mutability so a single shared
//! reference can be threaded through every phase of a program run.
//!
//! # Examples
//!
//! ```
//! use sable_util::{Handler, Span};
//!
//! let handler = Handler::new();
//! handler.error("unexpected token", Span::DUMMY);
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// An error that fails the statement (and the program's exit code)
    Error,
    /// A warning; execution continues
    Warning,
    /// Informational note
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "ERROR"),
            Level::Warning => write!(f, "WARNING"),
            Level::Note => write!(f, "NOTE"),
        }
    }
}

/// A diagnostic message with severity and source location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity level
    pub level: Level,
    /// Main diagnostic message
    pub message: String,
    /// Source location (DUMMY when no location applies)
    pub span: Span,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            message: message.into(),
            span,
        }
    }

    /// Create an error diagnostic.
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    /// Create a warning diagnostic.
    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }

    /// Render the diagnostic the way it appears in the log sink.
    ///
    /// Diagnostics with a real span include the line/column suffix.
    pub fn render(&self) -> String {
        if self.span == Span::DUMMY {
            format!("{}: {}", self.level, self.message)
        } else {
            format!(
                "{}: {} [line {}, column {}]",
                self.level, self.message, self.span.line, self.span.column
            )
        }
    }
}

/// Collector for diagnostics produced across an entire program run.
pub struct Handler {
    /// Collected diagnostics, in emission order
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new, empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Report an error.
    pub fn error(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::error(message, span));
    }

    /// Report a warning.
    pub fn warning(&self, message: impl Into<String>, span: Span) {
        self.emit(Diagnostic::warning(message, span));
    }

    /// Report a note.
    pub fn note(&self, message: impl Into<String>) {
        self.emit(Diagnostic::new(Level::Note, message, Span::DUMMY));
    }

    /// Emit a prebuilt diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// True if at least one error has been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Number of warnings reported so far.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Snapshot of all diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Remove and return all diagnostics collected so far.
    ///
    /// The driver drains the handler after each top-level statement so
    /// diagnostics reach the log sink in program order.
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Discard all collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl Default for Handler {
    fn default() -> Self {
        Self::new()
    }
}
