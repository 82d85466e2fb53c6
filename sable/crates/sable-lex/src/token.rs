//! Token definitions for the Sable lexer.
//!
//! The keyword set is closed: every word with special meaning in the
//! language has its own variant. Keywords are recognised case-insensitively
//! and many of them (the statistic names in particular) are still legal as
//! variable names, so [`Token::ident_text`] lets the parser treat any
//! keyword as an identifier in name position.

use std::fmt;

use sable_util::Span;

/// A lexical unit of Sable source code.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    // =========================================================================
    // STEP AND STATEMENT KEYWORDS
    // =========================================================================
    /// "data" - opens a DATA step
    Data,
    /// "set" - names the input dataset of a DATA step
    Set,
    /// "run" - terminates a step
    Run,
    /// "if"
    If,
    /// "then"
    Then,
    /// "else"
    Else,
    /// "else if" - fused by the lexer into a single token
    ElseIf,
    /// "do"
    Do,
    /// "until"
    Until,
    /// "while"
    While,
    /// "end"
    End,
    /// "to" - iterative DO bound
    To,
    /// "by" - BY statement and iterative DO step
    By,
    /// "merge"
    Merge,
    /// "drop"
    Drop,
    /// "keep"
    Keep,
    /// "retain"
    Retain,
    /// "array"
    Array,
    /// "output"
    Output,
    /// "options"
    Options,
    /// "libname"
    Libname,
    /// "title"
    Title,
    /// "input"
    Input,
    /// "datalines"
    Datalines,

    // =========================================================================
    // PROC KEYWORDS
    // =========================================================================
    /// "proc"
    Proc,
    /// "print"
    Print,
    /// "sort"
    Sort,
    /// "means"
    Means,
    /// "freq"
    Freq,
    /// "sql"
    Sql,

    // SQL sublanguage
    /// "select"
    Select,
    /// "from"
    From,
    /// "where"
    Where,
    /// "group"
    Group,
    /// "having"
    Having,
    /// "order"
    Order,
    /// "create"
    Create,
    /// "table"
    Table,
    /// "as"
    As,
    /// "insert"
    Insert,
    /// "update"
    Update,
    /// "delete"
    Delete,

    // Statistic names (PROC MEANS option list)
    /// "n"
    N,
    /// "mean"
    Mean,
    /// "median"
    Median,
    /// "std"
    Std,
    /// "min"
    Min,
    /// "max"
    Max,

    // Procedure options
    /// "noobs"
    Noobs,
    /// "nodupkey"
    NoDupKey,
    /// "duplicates"
    Duplicates,
    /// "chisq"
    Chisq,
    /// "obs"
    Obs,
    /// "label"
    Label,

    // =========================================================================
    // MACRO TOKENS
    // =========================================================================
    /// `%let`
    MacroLet,
    /// `%macro`
    MacroDef,
    /// `%mend`
    MacroEnd,
    /// `%do`
    MacroDo,
    /// `%if`
    MacroIf,
    /// `%then`
    MacroThen,
    /// `%else`
    MacroElse,
    /// `%NAME` - a macro call; carries the name without the sigil
    MacroCall(String),
    /// `&NAME` - a macro-variable reference; carries the name without the sigil
    MacroVar(String),

    // =========================================================================
    // IDENTIFIERS AND LITERALS
    // =========================================================================
    /// Identifier (variable, dataset, libref or function name).
    ///
    /// The original casing is preserved; name comparison is always
    /// case-insensitive downstream.
    Ident(String),
    /// Number literal `[0-9]+(\.[0-9]+)?`
    Number(f64),
    /// Single-quoted string literal (no escape sequences)
    Str(String),

    // =========================================================================
    // OPERATORS AND PUNCTUATION
    // =========================================================================
    /// "+"
    Plus,
    /// "-"
    Minus,
    /// "*"
    Star,
    /// "**" - exponentiation
    StarStar,
    /// "/"
    Slash,
    /// "=" - assignment, and equality inside expressions
    Eq,
    /// "=="
    EqEq,
    /// "!="
    NotEq,
    /// "<"
    Lt,
    /// "<="
    LtEq,
    /// ">"
    Gt,
    /// ">="
    GtEq,
    /// "("
    LParen,
    /// ")"
    RParen,
    /// "{"
    LBrace,
    /// "}"
    RBrace,
    /// "["
    LBracket,
    /// "]"
    RBracket,
    /// ","
    Comma,
    /// ";"
    Semicolon,
    /// "." - libref separator and the missing-value literal
    Dot,
    /// "$" - character-kind marker in INPUT and ARRAY statements
    Dollar,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    /// The raw text of a datalines block, terminator excluded
    DatalinesContent(String),
    /// End of input
    Eof,
    /// Unrecognised text, kept for error recovery
    Invalid(String),
}

impl Token {
    /// The identifier text of this token, if it can stand in name position.
    ///
    /// Keywords double as names (e.g. a variable called `min`); for those
    /// the canonical lowercase spelling is returned.
    pub fn ident_text(&self) -> Option<&str> {
        match self {
            Token::Ident(name) => Some(name),
            Token::Data => Some("data"),
            Token::Set => Some("set"),
            Token::Run => Some("run"),
            Token::If => Some("if"),
            Token::Then => Some("then"),
            Token::Else => Some("else"),
            Token::Do => Some("do"),
            Token::Until => Some("until"),
            Token::While => Some("while"),
            Token::End => Some("end"),
            Token::To => Some("to"),
            Token::By => Some("by"),
            Token::Merge => Some("merge"),
            Token::Drop => Some("drop"),
            Token::Keep => Some("keep"),
            Token::Retain => Some("retain"),
            Token::Array => Some("array"),
            Token::Output => Some("output"),
            Token::Options => Some("options"),
            Token::Libname => Some("libname"),
            Token::Title => Some("title"),
            Token::Input => Some("input"),
            Token::Datalines => Some("datalines"),
            Token::Proc => Some("proc"),
            Token::Print => Some("print"),
            Token::Sort => Some("sort"),
            Token::Means => Some("means"),
            Token::Freq => Some("freq"),
            Token::Sql => Some("sql"),
            Token::Select => Some("select"),
            Token::From => Some("from"),
            Token::Where => Some("where"),
            Token::Group => Some("group"),
            Token::Having => Some("having"),
            Token::Order => Some("order"),
            Token::Create => Some("create"),
            Token::Table => Some("table"),
            Token::As => Some("as"),
            Token::Insert => Some("insert"),
            Token::Update => Some("update"),
            Token::Delete => Some("delete"),
            Token::N => Some("n"),
            Token::Mean => Some("mean"),
            Token::Median => Some("median"),
            Token::Std => Some("std"),
            Token::Min => Some("min"),
            Token::Max => Some("max"),
            Token::Noobs => Some("noobs"),
            Token::NoDupKey => Some("nodupkey"),
            Token::Duplicates => Some("duplicates"),
            Token::Chisq => Some("chisq"),
            Token::Obs => Some("obs"),
            Token::Label => Some("label"),
            _ => None,
        }
    }

    /// True for keyword tokens (anything in the closed reserved set).
    pub fn is_keyword(&self) -> bool {
        !matches!(self, Token::Ident(_)) && self.ident_text().is_some()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "identifier '{name}'"),
            Token::Number(value) => write!(f, "number {value}"),
            Token::Str(value) => write!(f, "string '{value}'"),
            Token::MacroCall(name) => write!(f, "%{name}"),
            Token::MacroVar(name) => write!(f, "&{name}"),
            Token::MacroLet => write!(f, "%let"),
            Token::MacroDef => write!(f, "%macro"),
            Token::MacroEnd => write!(f, "%mend"),
            Token::MacroDo => write!(f, "%do"),
            Token::MacroIf => write!(f, "%if"),
            Token::MacroThen => write!(f, "%then"),
            Token::MacroElse => write!(f, "%else"),
            Token::ElseIf => write!(f, "'else if'"),
            Token::DatalinesContent(_) => write!(f, "datalines block"),
            Token::Eof => write!(f, "end of input"),
            Token::Invalid(text) => write!(f, "invalid token '{text}'"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::StarStar => write!(f, "'**'"),
            Token::Slash => write!(f, "'/'"),
            Token::Eq => write!(f, "'='"),
            Token::EqEq => write!(f, "'=='"),
            Token::NotEq => write!(f, "'!='"),
            Token::Lt => write!(f, "'<'"),
            Token::LtEq => write!(f, "'<='"),
            Token::Gt => write!(f, "'>'"),
            Token::GtEq => write!(f, "'>='"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Comma => write!(f, "','"),
            Token::Semicolon => write!(f, "';'"),
            Token::Dot => write!(f, "'.'"),
            Token::Dollar => write!(f, "'$'"),
            other => match other.ident_text() {
                Some(text) => write!(f, "keyword '{text}'"),
                None => write!(f, "{other:?}"),
            },
        }
    }
}

/// A token paired with its source span.
///
/// Spans are what let the parser slice raw statement text back out of the
/// source, which the macro processor needs for `&name` re-expansion and
/// `%macro` body capture.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenWithSpan {
    pub token: Token,
    pub span: Span,
}

impl TokenWithSpan {
    pub fn new(token: Token, span: Span) -> Self {
        Self { token, span }
    }
}

/// Maps identifier text to its keyword token, case-insensitively.
///
/// Returns `None` for ordinary identifiers.
pub fn keyword_from_ident(text: &str) -> Option<Token> {
    // The longest keyword is "duplicates" (10 chars); anything longer is
    // always a plain identifier.
    if text.len() > 10 {
        return None;
    }

    let lower = text.to_ascii_lowercase();
    let token = match lower.as_str() {
        "data" => Token::Data,
        "set" => Token::Set,
        "run" => Token::Run,
        "if" => Token::If,
        "then" => Token::Then,
        "else" => Token::Else,
        "do" => Token::Do,
        "until" => Token::Until,
        "while" => Token::While,
        "end" => Token::End,
        "to" => Token::To,
        "by" => Token::By,
        "merge" => Token::Merge,
        "drop" => Token::Drop,
        "keep" => Token::Keep,
        "retain" => Token::Retain,
        "array" => Token::Array,
        "output" => Token::Output,
        "options" => Token::Options,
        "libname" => Token::Libname,
        "title" => Token::Title,
        "input" => Token::Input,
        "datalines" => Token::Datalines,
        "proc" => Token::Proc,
        "print" => Token::Print,
        "sort" => Token::Sort,
        "means" => Token::Means,
        "freq" => Token::Freq,
        "sql" => Token::Sql,
        "select" => Token::Select,
        "from" => Token::From,
        "where" => Token::Where,
        "group" => Token::Group,
        "having" => Token::Having,
        "order" => Token::Order,
        "create" => Token::Create,
        "table" => Token::Table,
        "as" => Token::As,
        "insert" => Token::Insert,
        "update" => Token::Update,
        "delete" => Token::Delete,
        "n" => Token::N,
        "mean" => Token::Mean,
        "median" => Token::Median,
        "std" => Token::Std,
        "min" => Token::Min,
        "max" => Token::Max,
        "noobs" => Token::Noobs,
        "nodupkey" => Token::NoDupKey,
        "duplicates" => Token::Duplicates,
        "chisq" => Token::Chisq,
        "obs" => Token::Obs,
        "label" => Token::Label,
        _ => return None,
    };
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(keyword_from_ident("data"), Some(Token::Data));
        assert_eq!(keyword_from_ident("DATA"), Some(Token::Data));
        assert_eq!(keyword_from_ident("DaTa"), Some(Token::Data));
        assert_eq!(keyword_from_ident("nodupkey"), Some(Token::NoDupKey));
        assert_eq!(keyword_from_ident("dataset"), None);
        assert_eq!(keyword_from_ident("total"), None);
    }

    #[test]
    fn test_ident_text_for_keywords() {
        assert_eq!(Token::Min.ident_text(), Some("min"));
        assert_eq!(Token::Ident("Total".into()).ident_text(), Some("Total"));
        assert_eq!(Token::Semicolon.ident_text(), None);
        assert_eq!(Token::Number(1.0).ident_text(), None);
    }

    #[test]
    fn test_is_keyword() {
        assert!(Token::Data.is_keyword());
        assert!(Token::Median.is_keyword());
        assert!(!Token::Ident("median_x".into()).is_keyword());
        assert!(!Token::Comma.is_keyword());
    }
}
