//! Line-oriented REPL.
//!
//! Input accumulates across lines while the parser reports Incomplete,
//! which is how a multi-line DATA step gets typed naturally: nothing
//! executes until its `run;` arrives. The control words `exit`, `quit`,
//! `help` and `?` are recognised before parsing, on an empty buffer only.

use std::io::{self, BufRead, Write};

use sable_par::{ParseOutcome, Parser, Statement};
use sable_util::Handler;

use sable_eng::Interpreter;

const PROMPT: &str = "sable> ";
const CONTINUATION_PROMPT: &str = "   +> ";

pub fn run() -> anyhow::Result<i32> {
    let mut interpreter = Interpreter::new()?;
    let stdin = io::stdin();
    let mut buffer = String::new();

    println!("sable interpreter - type 'help' for commands, 'exit' to leave");
    loop {
        prompt(if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        });

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        if buffer.is_empty() {
            match line.trim() {
                "exit" | "quit" => break,
                "help" | "?" => {
                    print_help();
                    continue;
                }
                "" => continue,
                _ => {}
            }
        }
        buffer.push_str(&line);

        match try_parse(&buffer) {
            Parsed::Incomplete => continue,
            Parsed::Failed(message) => {
                eprintln!("ERROR: {message}");
                buffer.clear();
            }
            Parsed::Complete(statements) => {
                for statement in &statements {
                    interpreter.execute_statement(statement, &buffer);
                }
                buffer.clear();
            }
        }
    }

    Ok(interpreter.exit_code())
}

enum Parsed {
    /// Every statement in the buffer is complete.
    Complete(Vec<Statement>),
    /// The buffer ends mid-statement; keep accumulating.
    Incomplete,
    /// The buffer is malformed; report and discard it.
    Failed(String),
}

fn try_parse(buffer: &str) -> Parsed {
    let handler = Handler::new();
    let tokens = sable_lex::tokenize(buffer, &handler);
    let mut parser = Parser::new(buffer, tokens, &handler);

    let mut statements = Vec::new();
    let mut consumed_end = 0usize;
    loop {
        match parser.parse_statement() {
            ParseOutcome::Success(statement) => {
                consumed_end = statement.span.end;
                statements.push(statement);
            }
            ParseOutcome::Incomplete => {
                // Incomplete can also mean "nothing left but trailing
                // semicolons"; only genuine mid-statement tails wait for
                // more input.
                let rest = buffer.get(consumed_end..).unwrap_or_default();
                if rest.chars().all(|c| c == ';' || c.is_whitespace()) {
                    return Parsed::Complete(statements);
                }
                return Parsed::Incomplete;
            }
            ParseOutcome::Error(message) => return Parsed::Failed(message),
        }
    }
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = io::stdout().flush();
}

fn print_help() {
    println!("Commands:");
    println!("  exit, quit     leave the interpreter");
    println!("  help, ?        show this help");
    println!();
    println!("Anything else is Sable source. Statements end with ';';");
    println!("DATA and PROC steps run when their 'run;' line arrives.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_parse_complete_statement() {
        match try_parse("title 'done';") {
            Parsed::Complete(statements) => assert_eq!(statements.len(), 1),
            _ => panic!("expected a complete parse"),
        }
    }

    #[test]
    fn test_try_parse_accumulates_open_step() {
        assert!(matches!(try_parse("data out; set in;"), Parsed::Incomplete));
        assert!(matches!(
            try_parse("data out; set in; run;"),
            Parsed::Complete(_)
        ));
    }

    #[test]
    fn test_try_parse_trailing_semicolons_complete() {
        match try_parse("title 'x';;\n") {
            Parsed::Complete(statements) => assert_eq!(statements.len(), 1),
            _ => panic!("expected a complete parse"),
        }
    }

    #[test]
    fn test_try_parse_reports_errors() {
        assert!(matches!(try_parse("libname 'oops';"), Parsed::Failed(_)));
    }

    #[test]
    fn test_try_parse_multiple_statements() {
        match try_parse("title 'a'; options obs=2;") {
            Parsed::Complete(statements) => assert_eq!(statements.len(), 2),
            _ => panic!("expected a complete parse"),
        }
    }
}
