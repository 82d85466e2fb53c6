//! Edge-case tests for the parser: whole programs, recovery, and the
//! interplay between steps and global statements.

use sable_util::Handler;

use crate::ast::{DataStmt, StatementKind};
use crate::{ParseOutcome, Parser, Program};

fn parse(source: &str) -> (Program, Handler) {
    let handler = Handler::new();
    let program = {
        let tokens = sable_lex::tokenize(source, &handler);
        Parser::new(source, tokens, &handler).parse()
    };
    (program, handler)
}

// ============================================================================
// WHOLE PROGRAMS
// ============================================================================

#[test]
fn test_program_with_mixed_statements() {
    let source = "\
options obs=100;
libname lab 'data';
title 'Report';
data out; set lab.raw; if x > 1 then output; run;
proc sort data=out; by x; run;
proc print data=out noobs; run;";
    let (program, handler) = parse(source);
    assert!(
        !handler.has_errors(),
        "unexpected errors: {:?}",
        handler.diagnostics()
    );
    assert_eq!(program.statements.len(), 6);
}

#[test]
fn test_retain_accumulator_step() {
    let (program, handler) = parse("data out; set in; retain total 0; total = total + x; run;");
    assert!(!handler.has_errors());
    let StatementKind::DataStep(step) = &program.statements[0].kind else {
        panic!("expected data step");
    };
    assert_eq!(step.body.len(), 3);
    assert!(matches!(step.body[1], DataStmt::Retain(_)));
}

#[test]
fn test_do_loop_over_array_step() {
    let source = "data sq; array a{3} a1 a2 a3; do i = 1 to 3; a[i] = i*i; end; output; run;";
    let (program, handler) = parse(source);
    assert!(!handler.has_errors());
    let StatementKind::DataStep(step) = &program.statements[0].kind else {
        panic!("expected data step");
    };
    assert!(matches!(step.body[0], DataStmt::Array(_)));
    assert!(matches!(step.body[1], DataStmt::Do(_)));
    assert_eq!(step.body[2], DataStmt::Output);
}

// ============================================================================
// RECOVERY ACROSS STATEMENTS
// ============================================================================

#[test]
fn test_error_in_one_step_does_not_poison_next() {
    let source = "proc sort data=; run;\ndata out; set in; run;";
    let (program, handler) = parse(source);
    assert!(handler.has_errors());
    assert!(program
        .statements
        .iter()
        .any(|s| matches!(s.kind, StatementKind::DataStep(_))));
}

#[test]
fn test_unclosed_do_reports_error() {
    let (_, handler) = parse("data o; do i = 1 to 3; x = i; run;");
    assert!(handler.has_errors());
}

#[test]
fn test_two_errors_both_reported() {
    let (_, handler) = parse("data o; x = ; y = * 2; run;");
    assert!(handler.error_count() >= 2);
}

// ============================================================================
// REPL ACCUMULATION
// ============================================================================

#[test]
fn test_incomplete_data_step_accumulates() {
    for partial in [
        "data out;",
        "data out; set in;",
        "data out; set in; if x > 1",
        "data out; set in; if x > 1 then output;",
    ] {
        let handler = Handler::new();
        let tokens = sable_lex::tokenize(partial, &handler);
        let outcome = Parser::new(partial, tokens, &handler).parse_statement();
        assert_eq!(outcome, ParseOutcome::Incomplete, "for input {partial:?}");
    }

    let full = "data out; set in; if x > 1 then output; run;";
    let handler = Handler::new();
    let tokens = sable_lex::tokenize(full, &handler);
    let outcome = Parser::new(full, tokens, &handler).parse_statement();
    assert!(matches!(outcome, ParseOutcome::Success(_)));
}

#[test]
fn test_incomplete_macro_definition() {
    let partial = "%macro grow(n); data d&n;";
    let handler = Handler::new();
    let tokens = sable_lex::tokenize(partial, &handler);
    let outcome = Parser::new(partial, tokens, &handler).parse_statement();
    assert_eq!(outcome, ParseOutcome::Incomplete);
}

#[test]
fn test_incomplete_proc_sql() {
    let partial = "proc sql; select a from t;";
    let handler = Handler::new();
    let tokens = sable_lex::tokenize(partial, &handler);
    let outcome = Parser::new(partial, tokens, &handler).parse_statement();
    assert_eq!(outcome, ParseOutcome::Incomplete);
}
