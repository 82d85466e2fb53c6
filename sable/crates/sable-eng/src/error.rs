//! Runtime error taxonomy of the execution engine.
//!
//! Lexical and syntactic problems never reach these types - they go
//! through the diagnostic handler during lex/parse. Everything the
//! executors can fail with is here, so the driver has a single type to
//! catch per statement.

use thiserror::Error;

use sable_data::DataError;
use sable_mac::MacroError;

/// Runtime errors raised while executing a DATA step or PROC.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Call to a function the engine does not know.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Wrong number of arguments to a built-in function.
    #[error("function '{name}' expects {expected} argument(s), got {given}")]
    FunctionArity {
        name: String,
        expected: &'static str,
        given: usize,
    },

    /// Array subscript outside 1..=size.
    #[error("array '{name}' subscript {index} is out of bounds 1..{size}")]
    ArrayBounds {
        name: String,
        index: i64,
        size: usize,
    },

    /// Subscripted name with no ARRAY declaration.
    #[error("array '{0}' is not declared")]
    UndeclaredArray(String),

    /// ARRAY dimension does not match the variable count.
    #[error("array '{name}' declares {size} element(s) but lists {given} variable(s)")]
    ArrayShape {
        name: String,
        size: usize,
        given: usize,
    },

    /// Iterative DO with BY 0.
    #[error("DO loop BY value must not be zero")]
    DoStepZero,

    /// MERGE statement without a BY statement.
    #[error("MERGE requires a BY statement")]
    MergeWithoutBy,

    /// PROC SORT without a BY statement.
    #[error("PROC SORT requires a BY statement")]
    SortWithoutBy,

    /// A BY variable absent from one of the inputs.
    #[error("BY variable '{var}' not found in {dataset}")]
    ByVarMissing { var: String, dataset: String },

    /// A named column absent from the table (SQL and PROC statements).
    #[error("column '{column}' not found in {dataset}")]
    UnknownColumn { column: String, dataset: String },

    /// SQL feature the engine recognises but does not implement.
    #[error("unsupported SQL feature: {0}")]
    UnsupportedSql(String),

    /// `intck`/`intnx` with an interval other than "day".
    #[error("interval '{0}' is not supported (only 'day')")]
    BadInterval(String),

    /// Macro subsystem failure surfaced at execution time.
    #[error(transparent)]
    Macro(#[from] MacroError),

    /// Library or dataset store failure.
    #[error(transparent)]
    Data(#[from] DataError),
}
