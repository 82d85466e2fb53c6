//! sable-par - Recursive-descent parser for the Sable language.
//!
//! The parser consumes the token stream produced by `sable-lex` and builds
//! the tagged-union AST of [`ast`]. It works with one token of lookahead,
//! plus identifier-level lookahead for `data=`-style options and the
//! handful of contextual words (VAR, TABLES, INTO, SET, VALUES, QUIT) that
//! are not reserved.
//!
//! Two entry points:
//!
//! - [`Parser::parse`] consumes a whole program, logging syntax errors to
//!   the diagnostic handler and resynchronising at statement boundaries
//!   (the next `;` at paren/DO depth zero, or the step's `run;`).
//! - [`Parser::parse_statement`] parses a single statement and reports
//!   [`ParseOutcome::Incomplete`] when input ends mid-statement, which is
//!   what lets the REPL accumulate multi-line steps.
//!
//! Statements keep the span of their raw source text. The driver uses
//! those spans to re-expand `&name` macro references textually before
//! executing a node, and the parser itself uses them to capture `%let`
//! values and `%macro` bodies verbatim.

pub mod ast;
pub mod expr;
mod proc;
mod stmt;

#[cfg(test)]
mod edge_cases;

pub use ast::*;

use sable_lex::{Token, TokenWithSpan};
use sable_util::{Handler, Span};

/// Internal parse failure.
#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    /// Input ended before the statement's terminator.
    Incomplete,
    /// A syntax error at `span`.
    Syntax { message: String, span: Span },
}

/// Result alias used throughout the parser.
pub type ParseResult<T> = Result<T, ParseError>;

/// Outcome of parsing a single statement (the REPL contract).
#[derive(Clone, Debug, PartialEq)]
pub enum ParseOutcome {
    /// A complete statement was parsed.
    Success(Statement),
    /// Input ended mid-statement; the caller should supply more text.
    Incomplete,
    /// The statement is malformed.
    Error(String),
}

/// Recursive-descent parser over a token stream.
pub struct Parser<'a> {
    /// Original source text (for raw-text capture via token spans).
    source: &'a str,

    /// Token stream from the lexer, ending with Eof.
    tokens: Vec<TokenWithSpan>,

    /// Current position in the token stream.
    position: usize,

    /// Diagnostic handler for error reporting.
    handler: &'a Handler,
}

impl<'a> Parser<'a> {
    /// Create a parser over a pre-lexed token stream.
    ///
    /// `source` must be the text the tokens were lexed from; spans index
    /// into it.
    pub fn new(source: &'a str, tokens: Vec<TokenWithSpan>, handler: &'a Handler) -> Self {
        Self {
            source,
            tokens,
            position: 0,
            handler,
        }
    }

    /// Lex and parse `source` in one call.
    pub fn parse_source(source: &'a str, handler: &'a Handler) -> Program {
        let tokens = sable_lex::tokenize(source, handler);
        Parser::new(source, tokens, handler).parse()
    }

    /// Parse a complete program.
    ///
    /// Syntax errors are logged and the parser resynchronises at the next
    /// statement boundary, so one bad statement does not hide the rest.
    pub fn parse(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if self.skip_stray_tokens() {
                continue;
            }
            match self.parse_top_statement() {
                Ok(statement) => statements.push(statement),
                Err(ParseError::Incomplete) => {
                    self.handler
                        .error("unexpected end of input", self.current_span());
                    break;
                }
                Err(ParseError::Syntax { message, span }) => {
                    self.handler.error(message, span);
                    self.recover_to_statement_end();
                }
            }
        }

        Program { statements }
    }

    /// Parse one statement, reporting Incomplete for partial input.
    ///
    /// Unlike [`Parser::parse`], nothing is written to the handler here;
    /// the REPL decides how to surface the outcome.
    pub fn parse_statement(&mut self) -> ParseOutcome {
        self.skip_stray_semicolons();
        if self.is_at_end() {
            return ParseOutcome::Incomplete;
        }
        match self.parse_top_statement() {
            Ok(statement) => ParseOutcome::Success(statement),
            Err(ParseError::Incomplete) => ParseOutcome::Incomplete,
            Err(ParseError::Syntax { message, span }) => {
                if span.line > 0 {
                    ParseOutcome::Error(format!("{message} [line {}]", span.line))
                } else {
                    ParseOutcome::Error(message)
                }
            }
        }
    }

    /// True when every token before Eof has been consumed.
    pub fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    // ========================================================================
    // TOP-LEVEL DISPATCH
    // ========================================================================

    fn parse_top_statement(&mut self) -> ParseResult<Statement> {
        let start_span = self.current_span();
        let first_index = self.position;

        let kind = match self.current().clone() {
            Token::Data => self.parse_data_step(),
            Token::Proc => self.parse_proc(),
            Token::Options => self.parse_options(),
            Token::Libname => self.parse_libname(),
            Token::Title => self.parse_title(),
            Token::MacroLet => self.parse_macro_let(),
            Token::MacroDef => self.parse_macro_def(),
            Token::MacroCall(_) => self.parse_macro_call(),
            Token::Eof => Err(ParseError::Incomplete),
            other => Err(self.syntax_error(format!(
                "expected a DATA step, PROC or global statement, found {other}"
            ))),
        }?;

        let uses_macro_vars = self.tokens[first_index..self.position]
            .iter()
            .any(|t| matches!(t.token, Token::MacroVar(_)));

        Ok(Statement {
            kind,
            span: start_span.to(self.prev_span()),
            uses_macro_vars,
        })
    }

    /// `data lib.out; <body> run;`
    fn parse_data_step(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // data
        let output = self.parse_dataset_ref()?;
        self.expect_semicolon("after DATA statement")?;

        let mut body = Vec::new();
        loop {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            if self.eat(&Token::Run) {
                self.expect_semicolon("after RUN")?;
                break;
            }
            match self.parse_data_stmt() {
                Ok(statement) => body.push(statement),
                Err(ParseError::Incomplete) => return Err(ParseError::Incomplete),
                Err(ParseError::Syntax { message, span }) => {
                    self.handler.error(message, span);
                    self.recover_within_step();
                }
            }
        }

        Ok(StatementKind::DataStep(DataStep { output, body }))
    }

    /// `options name=value flag ...;`
    fn parse_options(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // options
        let mut options = Vec::new();
        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            let name = self.expect_name("option name")?;
            let value = if self.eat(&Token::Eq) {
                Some(self.option_value()?)
            } else {
                None
            };
            options.push(SessionOption { name, value });
        }
        self.advance(); // ';'
        Ok(StatementKind::Options(options))
    }

    /// An option value: number, string or bare word.
    fn option_value(&mut self) -> ParseResult<String> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(format_number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(s)
            }
            Token::Eof => Err(ParseError::Incomplete),
            tok => {
                if let Some(text) = tok.ident_text() {
                    let text = text.to_string();
                    self.advance();
                    Ok(text)
                } else {
                    Err(self.syntax_error(format!("malformed option value: {tok}")))
                }
            }
        }
    }

    /// `libname lib 'path';`
    fn parse_libname(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // libname
        let libref = self.expect_name("libref")?;
        let path = self.expect_string("library path")?;
        self.expect_semicolon("after LIBNAME statement")?;
        Ok(StatementKind::Libname { libref, path })
    }

    /// `title 'text';` - a bare `title;` clears the title.
    fn parse_title(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // title
        let text = if self.check(&Token::Semicolon) {
            String::new()
        } else {
            self.expect_string("title text")?
        };
        self.expect_semicolon("after TITLE statement")?;
        Ok(StatementKind::Title(text))
    }

    // ========================================================================
    // MACRO STATEMENTS
    // ========================================================================

    /// `%let name = value;` - the value is captured as raw text.
    fn parse_macro_let(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // %let
        let name = self.expect_name("macro variable name")?;
        self.expect(&Token::Eq, "'=' in %let")?;
        let value = self.capture_until_semicolon()?;
        Ok(StatementKind::MacroLet { name, value })
    }

    /// `%macro name(p1, ...); body %mend [name];`
    fn parse_macro_def(&mut self) -> ParseResult<StatementKind> {
        self.advance(); // %macro
        let name = self.expect_name("macro name")?;

        let mut params = Vec::new();
        if self.eat(&Token::LParen) {
            if !self.check(&Token::RParen) {
                loop {
                    params.push(self.expect_name("macro parameter")?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen, "')' after macro parameters")?;
        }
        self.expect_semicolon("after %macro header")?;

        // Body: everything up to %mend, verbatim.
        let body_start = self.current_span().start;
        let mut body_end = body_start;
        while !self.check(&Token::MacroEnd) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            body_end = self.advance().span.end;
        }
        let body = self.source[body_start..body_end].trim().to_string();
        self.advance(); // %mend

        // Optional repeated macro name before the terminator.
        if !self.check(&Token::Semicolon) && self.current().ident_text().is_some() {
            self.advance();
        }
        self.expect_semicolon("after %mend")?;

        Ok(StatementKind::MacroDefinition(MacroDef {
            name,
            params,
            body,
        }))
    }

    /// `%name(a1, ...);` - arguments are captured as raw text.
    fn parse_macro_call(&mut self) -> ParseResult<StatementKind> {
        let name = match self.advance().token {
            Token::MacroCall(name) => name,
            other => {
                return Err(self.syntax_error(format!("expected macro call, found {other}")));
            }
        };

        let mut args = Vec::new();
        if self.eat(&Token::LParen) {
            if !self.check(&Token::RParen) {
                loop {
                    args.push(self.capture_macro_arg()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(&Token::RParen, "')' after macro arguments")?;
        }
        self.expect_semicolon("after macro call")?;

        Ok(StatementKind::MacroCall { name, args })
    }

    /// Raw text of one macro argument: tokens up to the next ',' or ')'
    /// at paren depth zero.
    fn capture_macro_arg(&mut self) -> ParseResult<String> {
        let start = self.current_span().start;
        let mut end = start;
        let mut depth = 0usize;
        loop {
            match self.current() {
                Token::Eof => return Err(ParseError::Incomplete),
                Token::Comma | Token::RParen if depth == 0 => break,
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                _ => {}
            }
            end = self.advance().span.end;
        }
        Ok(self.source[start..end].trim().to_string())
    }

    /// Raw text up to the next ';', which is consumed.
    fn capture_until_semicolon(&mut self) -> ParseResult<String> {
        let start = self.current_span().start;
        let mut end = start;
        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            end = self.advance().span.end;
        }
        self.advance(); // ';'
        Ok(self.source[start..end].trim().to_string())
    }

    // ========================================================================
    // SHARED PIECES
    // ========================================================================

    /// `libref.name` or bare `name`.
    pub(crate) fn parse_dataset_ref(&mut self) -> ParseResult<DatasetRef> {
        let first = self.expect_name("dataset name")?;
        if self.eat(&Token::Dot) {
            let name = self.expect_name("dataset name after libref")?;
            Ok(DatasetRef::new(Some(first), name))
        } else {
            Ok(DatasetRef::new(None, first))
        }
    }

    /// Variable names up to the next ';' (which is consumed).
    pub(crate) fn parse_name_list(&mut self) -> ParseResult<Vec<String>> {
        let mut names = Vec::new();
        while !self.check(&Token::Semicolon) {
            if self.is_at_end() {
                return Err(ParseError::Incomplete);
            }
            names.push(self.expect_name("variable name")?);
        }
        self.advance(); // ';'
        Ok(names)
    }

    // ========================================================================
    // ERROR RECOVERY
    // ========================================================================

    /// Skip to just past the next ';' at paren/DO depth zero.
    fn recover_to_statement_end(&mut self) {
        let mut paren_depth = 0usize;
        let mut do_depth = 0usize;
        while !self.is_at_end() {
            match self.advance().token {
                Token::LParen => paren_depth += 1,
                Token::RParen => paren_depth = paren_depth.saturating_sub(1),
                Token::Do => do_depth += 1,
                Token::End => do_depth = do_depth.saturating_sub(1),
                Token::Semicolon if paren_depth == 0 && do_depth == 0 => return,
                _ => {}
            }
        }
    }

    /// Within a step: skip to just past the next ';', stopping short of
    /// RUN so the step terminator is still seen by the caller.
    fn recover_within_step(&mut self) {
        while !self.is_at_end() && !self.check(&Token::Run) {
            if self.check(&Token::Semicolon) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Consume stray ';' and dangling `run;` tokens between statements.
    fn skip_stray_tokens(&mut self) -> bool {
        if self.skip_stray_semicolons() {
            return true;
        }
        if self.check(&Token::Run) && self.peek(1) == &Token::Semicolon {
            self.advance();
            self.advance();
            return true;
        }
        false
    }

    fn skip_stray_semicolons(&mut self) -> bool {
        let mut skipped = false;
        while self.check(&Token::Semicolon) {
            self.advance();
            skipped = true;
        }
        skipped
    }

    // ========================================================================
    // TOKEN PRIMITIVES
    // ========================================================================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)].token
    }

    pub(crate) fn current_span(&self) -> Span {
        self.tokens[self.position.min(self.tokens.len() - 1)].span
    }

    /// Span of the most recently consumed token.
    pub(crate) fn prev_span(&self) -> Span {
        if self.position == 0 {
            return self.current_span();
        }
        self.tokens[(self.position - 1).min(self.tokens.len() - 1)].span
    }

    pub(crate) fn peek(&self, offset: usize) -> &Token {
        &self.tokens[(self.position + offset).min(self.tokens.len() - 1)].token
    }

    /// Consume and return the current token (Eof is never consumed).
    pub(crate) fn advance(&mut self) -> TokenWithSpan {
        let spanned = self.tokens[self.position.min(self.tokens.len() - 1)].clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        spanned
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        self.current() == token
    }

    /// Consume the token if it matches.
    pub(crate) fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require `token`, with `context` woven into the error message.
    pub(crate) fn expect(&mut self, token: &Token, context: &str) -> ParseResult<TokenWithSpan> {
        if self.check(token) {
            Ok(self.advance())
        } else if self.is_at_end() {
            Err(ParseError::Incomplete)
        } else {
            Err(self.syntax_error(format!(
                "expected {token} {context}, found {}",
                self.current()
            )))
        }
    }

    pub(crate) fn expect_semicolon(&mut self, context: &str) -> ParseResult<()> {
        self.expect(&Token::Semicolon, context)?;
        Ok(())
    }

    /// Require a name; keywords are legal in name position.
    pub(crate) fn expect_name(&mut self, what: &str) -> ParseResult<String> {
        if self.is_at_end() {
            return Err(ParseError::Incomplete);
        }
        let name = match self.current().ident_text() {
            Some(name) => name.to_string(),
            None => {
                return Err(
                    self.syntax_error(format!("expected {what}, found {}", self.current()))
                );
            }
        };
        self.advance();
        Ok(name)
    }

    /// Require a string literal.
    pub(crate) fn expect_string(&mut self, what: &str) -> ParseResult<String> {
        match self.current().clone() {
            Token::Str(text) => {
                self.advance();
                Ok(text)
            }
            Token::Eof => Err(ParseError::Incomplete),
            other => Err(self.syntax_error(format!("expected {what}, found {other}"))),
        }
    }

    pub(crate) fn syntax_error(&self, message: String) -> ParseError {
        ParseError::Syntax {
            message,
            span: self.current_span(),
        }
    }
}

/// Render a numeric option value without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
