//! sable-lex - Lexical analyzer for the Sable data-step language.
//!
//! The lexer turns free-form, case-insensitive, semicolon-terminated source
//! into a token stream. Three quirks of the language live entirely in this
//! crate so the parser never sees them:
//!
//! - **Datalines mode**: after `DATALINES;` the lexer switches to a raw
//!   line reader and emits the whole block (up to a lone `;` line) as a
//!   single [`Token::DatalinesContent`].
//! - **`ELSE IF` fusion**: `ELSE` followed by `IF` is emitted as one
//!   [`Token::ElseIf`] token.
//! - **Macro sigils**: `%let`, `%macro`, `%mend`, `%NAME` calls and
//!   `&name` references become dedicated tokens; substitution itself is
//!   the macro processor's job.
//!
//! Lexical errors (unterminated strings, unknown characters) are reported
//! through the shared diagnostic handler with line/column positions and
//! the lexer recovers by emitting [`Token::Invalid`].

pub mod cursor;
pub mod lexer;
pub mod token;

#[cfg(test)]
mod edge_cases;

pub use cursor::Cursor;
pub use lexer::{tokenize, Lexer};
pub use token::{keyword_from_ident, Token, TokenWithSpan};
