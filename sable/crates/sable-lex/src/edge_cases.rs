//! Edge-case tests for the lexer: interactions between the mode switches
//! and ordinary tokenization.

use sable_util::Handler;

use crate::lexer::{tokenize, Lexer};
use crate::token::Token;

fn lex(source: &str) -> Vec<Token> {
    let handler = Handler::new();
    Lexer::new(source, &handler).collect()
}

// ============================================================================
// MODE INTERACTIONS
// ============================================================================

#[test]
fn test_else_if_across_newline() {
    let tokens = lex("else\n   if x > 1 then output;");
    assert_eq!(tokens[0], Token::ElseIf);
}

#[test]
fn test_datalines_content_may_contain_semicolons_inline() {
    // Only a *lone* ';' line terminates the block.
    let source = "datalines;\nA;B 1\n;\n";
    let tokens = lex(source);
    assert!(tokens.contains(&Token::DatalinesContent("A;B 1".into())));
}

#[test]
fn test_datalines_keyword_requires_semicolon_to_arm() {
    // An identifier between DATALINES and ';' disarms raw mode.
    let source = "datalines x; y";
    let tokens = lex(source);
    assert_eq!(
        tokens,
        vec![
            Token::Datalines,
            Token::Ident("x".into()),
            Token::Semicolon,
            Token::Ident("y".into()),
        ]
    );
}

#[test]
fn test_comment_star_does_not_eat_multiplication() {
    let tokens = lex("y = 2;* note\nx = y*3;");
    assert!(tokens.contains(&Token::Star));
    assert_eq!(tokens.iter().filter(|t| **t == Token::Star).count(), 1);
}

#[test]
fn test_comment_as_first_line_of_program() {
    let tokens = lex("* generated by nightly job\nlibname a 'x';");
    assert_eq!(tokens[0], Token::Libname);
}

// ============================================================================
// STATEMENT TEXTURE
// ============================================================================

#[test]
fn test_full_data_step() {
    let source = "data out; set in; if x > 10 then output; run;";
    let tokens = lex(source);
    assert_eq!(
        tokens,
        vec![
            Token::Data,
            Token::Ident("out".into()),
            Token::Semicolon,
            Token::Set,
            Token::Ident("in".into()),
            Token::Semicolon,
            Token::If,
            Token::Ident("x".into()),
            Token::Gt,
            Token::Number(10.0),
            Token::Then,
            Token::Output,
            Token::Semicolon,
            Token::Run,
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_proc_sort_options() {
    let tokens = lex("proc sort data=t out=u nodupkey; by k; run;");
    assert!(tokens.contains(&Token::Proc));
    assert!(tokens.contains(&Token::Sort));
    assert!(tokens.contains(&Token::NoDupKey));
    assert!(tokens.contains(&Token::By));
}

#[test]
fn test_sql_keywords() {
    let tokens = lex("proc sql; select a from t where x > 1 order by a; run;");
    for expected in [
        Token::Sql,
        Token::Select,
        Token::From,
        Token::Where,
        Token::Order,
        Token::By,
    ] {
        assert!(tokens.contains(&expected), "missing {expected:?}");
    }
}

#[test]
fn test_libref_qualified_name() {
    let tokens = lex("data mylib.out;");
    assert_eq!(
        tokens,
        vec![
            Token::Data,
            Token::Ident("mylib".into()),
            Token::Dot,
            Token::Ident("out".into()),
            Token::Semicolon,
        ]
    );
}

#[test]
fn test_array_braces_and_brackets() {
    let tokens = lex("array a{3} a1 a2 a3; a[i] = 1;");
    assert!(tokens.contains(&Token::LBrace));
    assert!(tokens.contains(&Token::RBrace));
    assert!(tokens.contains(&Token::LBracket));
    assert!(tokens.contains(&Token::RBracket));
}

#[test]
fn test_input_dollar_marker() {
    let tokens = lex("input name $ age;");
    assert_eq!(
        tokens,
        vec![
            Token::Input,
            Token::Ident("name".into()),
            Token::Dollar,
            Token::Ident("age".into()),
            Token::Semicolon,
        ]
    );
}

// ============================================================================
// DIAGNOSTIC POSITIONS
// ============================================================================

#[test]
fn test_error_carries_line_and_column() {
    let handler = Handler::new();
    let source = "x = 1;\n  @";
    let _tokens: Vec<Token> = Lexer::new(source, &handler).collect();
    let diags = handler.diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].span.line, 2);
    assert_eq!(diags[0].span.column, 3);
}

#[test]
fn test_tokenize_ends_with_eof() {
    let handler = Handler::new();
    let tokens = tokenize("run;", &handler);
    assert_eq!(tokens.last().map(|t| t.token.clone()), Some(Token::Eof));
    assert_eq!(tokens.len(), 3);
}
