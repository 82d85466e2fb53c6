//! sable-util - Foundation types for the Sable interpreter.
//!
//! This crate holds the pieces every other phase leans on: source spans,
//! the diagnostic handler that collects errors and warnings across lexing,
//! parsing and execution, and the line-oriented output sinks (the *log*
//! sink for NOTE/WARNING/ERROR traffic and the *list* sink for procedure
//! output).

pub mod diag;
pub mod sink;
pub mod span;

pub use diag::{Diagnostic, Handler, Level};
pub use sink::{ConsoleSink, LineSink, MemorySink};
pub use span::Span;
