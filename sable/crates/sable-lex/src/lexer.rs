//! Main lexer implementation for the Sable data-step language.
//!
//! The lexer transforms source code into a stream of tokens. Besides the
//! usual identifier/number/string/operator classes it implements the three
//! context-sensitive behaviours of the language: the raw-line datalines
//! mode, `ELSE IF` fusion, and `*` comments in statement position.

use sable_util::{Handler, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token, TokenWithSpan};

/// The lexer for Sable source code.
///
/// # Example
///
/// ```
/// use sable_lex::{Lexer, Token};
/// use sable_util::Handler;
///
/// let handler = Handler::new();
/// let mut lexer = Lexer::new("data out; set in; run;", &handler);
///
/// assert_eq!(lexer.next_token(), Token::Data);
/// assert_eq!(lexer.next_token(), Token::Ident("out".into()));
/// ```
pub struct Lexer<'a> {
    /// Character cursor for traversing source.
    cursor: Cursor<'a>,

    /// Diagnostic handler for error reporting.
    handler: &'a Handler,

    /// Start position of the current token.
    token_start: usize,

    /// Start line of the current token.
    token_start_line: u32,

    /// Start column of the current token.
    token_start_column: u32,

    /// True at the start of input and right after a ';' token. Only in
    /// this position does '*' open a comment.
    at_stmt_start: bool,

    /// The DATALINES keyword has been emitted; a following ';' switches
    /// the lexer into raw-line mode.
    datalines_armed: bool,

    /// Raw-line mode is active; the next token is the datalines block.
    in_datalines: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`, reporting errors to `handler`.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
            at_stmt_start: true,
            datalines_armed: false,
            in_datalines: false,
        }
    }

    /// Returns the next token together with its source span.
    pub fn next_spanned(&mut self) -> TokenWithSpan {
        let token = self.next_token();
        TokenWithSpan::new(token, self.token_span())
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let token = self.scan_token();

        // Statement-position and datalines bookkeeping happen here so the
        // individual scanners stay oblivious to them.
        match &token {
            Token::Semicolon => {
                if self.datalines_armed {
                    self.datalines_armed = false;
                    self.in_datalines = true;
                }
                self.at_stmt_start = true;
            }
            Token::Datalines => {
                self.datalines_armed = true;
                self.at_stmt_start = false;
            }
            Token::DatalinesContent(_) => {
                self.at_stmt_start = true;
            }
            Token::Eof => {}
            _ => {
                self.datalines_armed = false;
                self.at_stmt_start = false;
            }
        }

        token
    }

    /// Span of the most recently returned token.
    pub fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    fn scan_token(&mut self) -> Token {
        if self.in_datalines {
            self.in_datalines = false;
            return self.lex_datalines_block();
        }

        self.skip_trivia();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Token::Eof;
        }

        match self.cursor.current_char() {
            '(' => {
                self.cursor.advance();
                Token::LParen
            }
            ')' => {
                self.cursor.advance();
                Token::RParen
            }
            '{' => {
                self.cursor.advance();
                Token::LBrace
            }
            '}' => {
                self.cursor.advance();
                Token::RBrace
            }
            '[' => {
                self.cursor.advance();
                Token::LBracket
            }
            ']' => {
                self.cursor.advance();
                Token::RBracket
            }
            ',' => {
                self.cursor.advance();
                Token::Comma
            }
            ';' => {
                self.cursor.advance();
                Token::Semicolon
            }
            '+' => {
                self.cursor.advance();
                Token::Plus
            }
            '-' => {
                self.cursor.advance();
                Token::Minus
            }
            '*' => self.lex_star(),
            '/' => {
                self.cursor.advance();
                Token::Slash
            }
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '.' => {
                self.cursor.advance();
                Token::Dot
            }
            '$' => {
                self.cursor.advance();
                Token::Dollar
            }
            '\'' => self.lex_string(),
            '%' => self.lex_macro_sigil(),
            '&' => self.lex_macro_var(),

            c if is_ident_start(c) => self.lex_identifier(),
            c if c.is_ascii_digit() => self.lex_number(),

            c => {
                self.report_error(format!("unexpected character '{c}'"));
                self.cursor.advance();
                Token::Invalid(c.to_string())
            }
        }
    }

    /// Lexes an identifier or keyword; fuses `ELSE IF` into one token.
    fn lex_identifier(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(self.token_start);

        match keyword_from_ident(text) {
            Some(Token::Else) => {
                // Look ahead past whitespace; ELSE directly followed by IF
                // becomes a single ELSE_IF token, otherwise rewind.
                let mut ahead = self.cursor.clone();
                ahead.skip_whitespace();
                let word_start = ahead.position();
                while is_ident_continue(ahead.current_char()) {
                    ahead.advance();
                }
                if ahead.slice_from(word_start).eq_ignore_ascii_case("if") {
                    self.cursor = ahead;
                    Token::ElseIf
                } else {
                    Token::Else
                }
            }
            Some(keyword) => keyword,
            None => Token::Ident(text.to_string()),
        }
    }

    /// Lexes a number literal `[0-9]+(\.[0-9]+)?`.
    ///
    /// A trailing '.' with no digit after it is left alone so `1.` lexes as
    /// number then dot (the dot may open a libref-qualified name).
    fn lex_number(&mut self) -> Token {
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }
        if self.cursor.current_char() == '.' && self.cursor.char_at(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current_char().is_ascii_digit() {
                self.cursor.advance();
            }
        }

        let text = self.cursor.slice_from(self.token_start);
        match text.parse::<f64>() {
            Ok(value) => Token::Number(value),
            Err(err) => {
                self.report_error(format!("invalid number literal '{text}': {err}"));
                Token::Number(0.0)
            }
        }
    }

    /// Lexes a single-quoted string literal. No escape sequences.
    fn lex_string(&mut self) -> Token {
        self.cursor.advance(); // opening quote

        let content_start = self.cursor.position();
        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated string literal".to_string());
                let content = self.cursor.slice_from(content_start).to_string();
                return Token::Str(content);
            }
            if self.cursor.current_char() == '\'' {
                break;
            }
            self.cursor.advance();
        }

        let content = self.cursor.slice_from(content_start).to_string();
        self.cursor.advance(); // closing quote
        Token::Str(content)
    }

    /// Lexes star or star-star.
    fn lex_star(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('*') {
            Token::StarStar
        } else {
            Token::Star
        }
    }

    /// Lexes equals or equals-equals.
    fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::EqEq
        } else {
            Token::Eq
        }
    }

    /// Lexes not-equals. A bare '!' is not an operator in this language.
    fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::NotEq
        } else {
            self.report_error("unexpected character '!'".to_string());
            Token::Invalid("!".to_string())
        }
    }

    /// Lexes less or less-equals.
    fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::LtEq
        } else {
            Token::Lt
        }
    }

    /// Lexes greater or greater-equals.
    fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::GtEq
        } else {
            Token::Gt
        }
    }

    /// Lexes `%let`, `%macro`, `%mend`, `%do`, `%if`, `%then`, `%else`
    /// or a `%NAME` macro call.
    fn lex_macro_sigil(&mut self) -> Token {
        self.cursor.advance(); // '%'

        let name_start = self.cursor.position();
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let name = self.cursor.slice_from(name_start);
        if name.is_empty() {
            self.report_error("illegal macro token: '%' must be followed by a name".to_string());
            return Token::Invalid("%".to_string());
        }

        match name.to_ascii_lowercase().as_str() {
            "let" => Token::MacroLet,
            "macro" => Token::MacroDef,
            "mend" => Token::MacroEnd,
            "do" => Token::MacroDo,
            "if" => Token::MacroIf,
            "then" => Token::MacroThen,
            "else" => Token::MacroElse,
            _ => Token::MacroCall(name.to_string()),
        }
    }

    /// Lexes a `&name` macro-variable reference.
    fn lex_macro_var(&mut self) -> Token {
        self.cursor.advance(); // '&'

        let name_start = self.cursor.position();
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let name = self.cursor.slice_from(name_start);
        if name.is_empty() {
            self.report_error("illegal macro token: '&' must be followed by a name".to_string());
            return Token::Invalid("&".to_string());
        }
        Token::MacroVar(name.to_string())
    }

    /// Reads the raw datalines block: whole lines, verbatim, until a line
    /// whose trimmed content is a single ';'.
    fn lex_datalines_block(&mut self) -> Token {
        // Discard the remainder of the line holding the 'datalines;'
        // terminator itself.
        self.cursor.take_line();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        let mut lines: Vec<&str> = Vec::new();
        let mut terminated = false;
        while !self.cursor.is_at_end() {
            let line = self.cursor.take_line();
            if line.trim() == ";" {
                terminated = true;
                break;
            }
            lines.push(line);
        }
        if !terminated {
            self.report_error("datalines block not terminated by ';'".to_string());
        }

        Token::DatalinesContent(lines.join("\n"))
    }

    /// Skips whitespace and, in statement position, '*' comments running
    /// to end of line.
    fn skip_trivia(&mut self) {
        loop {
            self.cursor.skip_whitespace();
            if self.at_stmt_start && self.cursor.current_char() == '*' {
                self.cursor.skip_to_line_end();
                continue;
            }
            break;
        }
    }

    /// Reports a lexical error at the current token position.
    fn report_error(&mut self, message: String) {
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        );
        self.handler.error(message, span);
    }
}

/// Make Lexer an iterator over tokens, ending before Eof.
impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token == Token::Eof {
            None
        } else {
            Some(token)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Tokenizes an entire source string, including the trailing Eof token.
pub fn tokenize(source: &str, handler: &Handler) -> Vec<TokenWithSpan> {
    let mut lexer = Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let spanned = lexer.next_spanned();
        let done = spanned.token == Token::Eof;
        tokens.push(spanned);
        if done {
            break;
        }
    }
    tokens
}
