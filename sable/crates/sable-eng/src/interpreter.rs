//! The interpreter driver.
//!
//! Owns the session: environment (libraries, options, title, macro
//! state), the shared diagnostic handler and the two output sinks. Each
//! top-level statement is dispatched by node kind; runtime errors are
//! caught per statement so one bad step never aborts the program.
//!
//! Macro substitution happens here, textually, before execution reaches
//! a node: statements whose tokens contain `&name` references are
//! re-expanded from their raw source text, re-lexed, re-parsed and then
//! executed. Macro calls run their stored body the same way, inside a
//! variable-table scope that is restored on every exit path.

use std::path::Path;

use sable_data::{Access, Backend};
use sable_par::{Parser, Statement, StatementKind};
use sable_util::{ConsoleSink, Handler, Level, LineSink, Span};

use crate::data_step;
use crate::env::DataEnvironment;
use crate::error::EngineError;
use crate::procs;
use crate::timer::StepTimer;

/// Backstop against self-referential macro text.
const MAX_EXPANSION_DEPTH: usize = 32;

/// Exit codes of a program run.
pub const EXIT_OK: i32 = 0;
pub const EXIT_PARSE_ERRORS: i32 = 1;
pub const EXIT_RUNTIME_ERRORS: i32 = 2;

/// One interpreter session.
pub struct Interpreter {
    env: DataEnvironment,
    handler: Handler,
    log_sink: Box<dyn LineSink>,
    list_sink: Box<dyn LineSink>,
    parse_errors: bool,
    runtime_errors: bool,
}

impl Interpreter {
    /// A session writing its log to stderr and its listing to stdout.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_sinks(
            Box::new(ConsoleSink::stderr()),
            Box::new(ConsoleSink::stdout()),
        )
    }

    /// A session with caller-supplied sinks (REPL, tests).
    pub fn with_sinks(
        log_sink: Box<dyn LineSink>,
        list_sink: Box<dyn LineSink>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            env: DataEnvironment::new()?,
            handler: Handler::new(),
            log_sink,
            list_sink,
            parse_errors: false,
            runtime_errors: false,
        })
    }

    /// Parse and execute a whole program, returning the exit code.
    pub fn run_program(&mut self, source: &str) -> i32 {
        let program = Parser::parse_source(source, &self.handler);
        self.flush_diagnostics(true);

        for statement in &program.statements {
            self.execute_statement(statement, source);
        }
        self.exit_code()
    }

    /// Execute one parsed statement. `source` must be the text the
    /// statement's span indexes into (the REPL's accumulated buffer).
    pub fn execute_statement(&mut self, statement: &Statement, source: &str) {
        self.execute_at_depth(statement, source, 0);
        self.flush_diagnostics(false);
    }

    /// 0 on success, 1 after parse/lex errors, 2 after runtime errors.
    pub fn exit_code(&self) -> i32 {
        if self.parse_errors {
            EXIT_PARSE_ERRORS
        } else if self.runtime_errors {
            EXIT_RUNTIME_ERRORS
        } else {
            EXIT_OK
        }
    }

    /// Session environment, for inspection by the front-end and tests.
    pub fn env(&self) -> &DataEnvironment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut DataEnvironment {
        &mut self.env
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    fn execute_at_depth(&mut self, statement: &Statement, source: &str, depth: usize) {
        match &statement.kind {
            // Macro nodes execute purely on the macro state.
            StatementKind::MacroLet { name, value } => {
                if let Err(err) = self.env.macros.define_var(name, value) {
                    self.runtime_error(err.to_string());
                }
            }
            StatementKind::MacroDefinition(def) => {
                if let Err(err) = self.env.macros.define_macro(def.clone()) {
                    self.runtime_error(err.to_string());
                }
            }
            StatementKind::MacroCall { name, args } => {
                self.run_macro_call(name, args, depth);
            }

            // Any other statement carrying &name references is expanded
            // textually and re-parsed before it runs.
            _ if statement.uses_macro_vars => {
                self.reexpand_and_run(statement, source, depth);
            }

            kind => {
                if let Err(err) = self.dispatch(kind) {
                    self.runtime_error(err.to_string());
                }
            }
        }
    }

    fn reexpand_and_run(&mut self, statement: &Statement, source: &str, depth: usize) {
        if depth >= MAX_EXPANSION_DEPTH {
            self.runtime_error("macro expansion nested too deeply".to_string());
            return;
        }
        let span = statement.span;
        let raw = source.get(span.start..span.end).unwrap_or_default();
        match self.env.macros.expand(raw) {
            Ok(text) => self.run_fragment(&text, depth + 1),
            Err(err) => self.runtime_error(err.to_string()),
        }
    }

    fn run_macro_call(&mut self, name: &str, args: &[String], depth: usize) {
        if depth >= MAX_EXPANSION_DEPTH {
            self.runtime_error("macro expansion nested too deeply".to_string());
            return;
        }
        match self.env.macros.begin_call(name, args) {
            Ok((body, scope)) => {
                self.run_fragment(&body, depth + 1);
                // Restore the variable snapshot whatever the body did.
                self.env.macros.end_call(scope);
            }
            Err(err) => self.runtime_error(err.to_string()),
        }
    }

    /// Lex, parse and execute macro-produced text. Parse failures in the
    /// fragment count as runtime errors of the originating statement.
    fn run_fragment(&mut self, source: &str, depth: usize) {
        let local = Handler::new();
        let program = Parser::parse_source(source, &local);
        let had_errors = local.has_errors();
        for diagnostic in local.drain() {
            self.handler.emit(diagnostic);
        }
        if had_errors {
            self.runtime_errors = true;
        }
        for statement in &program.statements {
            self.execute_at_depth(statement, source, depth);
        }
    }

    fn dispatch(&mut self, kind: &StatementKind) -> Result<(), EngineError> {
        match kind {
            StatementKind::DataStep(step) => {
                let report = {
                    let _timer = StepTimer::new("DATA statement", &self.handler);
                    data_step::execute(&mut self.env, &self.handler, step)?
                };
                self.handler.note(format!(
                    "The data set {} has {} observations and {} variables.",
                    report.dataset, report.rows, report.vars
                ));
                Ok(())
            }
            StatementKind::Proc(proc) => {
                let report = {
                    let _timer =
                        StepTimer::new(format!("PROCEDURE {}", proc.name()), &self.handler);
                    procs::execute(&mut self.env, &self.handler, self.list_sink.as_mut(), proc)?
                };
                if let Some(report) = report {
                    self.handler.note(format!(
                        "The data set {} has {} observations and {} variables.",
                        report.dataset, report.rows, report.vars
                    ));
                }
                Ok(())
            }
            StatementKind::Options(options) => {
                for option in options {
                    self.env.set_option(&option.name, option.value.as_deref());
                }
                Ok(())
            }
            StatementKind::Libname { libref, path } => {
                self.env.store.define_library(
                    libref,
                    Path::new(path),
                    Access::ReadWrite,
                    Backend::Binary,
                )?;
                self.handler.note(format!(
                    "Libref {} was successfully assigned.",
                    libref.to_ascii_uppercase()
                ));
                Ok(())
            }
            StatementKind::Title(text) => {
                self.env.title = if text.is_empty() {
                    None
                } else {
                    Some(text.clone())
                };
                Ok(())
            }
            // Macro nodes never reach dispatch; they are handled in
            // execute_at_depth.
            StatementKind::MacroLet { .. }
            | StatementKind::MacroDefinition(_)
            | StatementKind::MacroCall { .. } => Ok(()),
        }
    }

    // ========================================================================
    // DIAGNOSTIC ROUTING
    // ========================================================================

    fn runtime_error(&mut self, message: String) {
        self.runtime_errors = true;
        self.handler.error(message, Span::DUMMY);
    }

    /// Drain collected diagnostics into the log sink, in order, updating
    /// the exit-code flags.
    fn flush_diagnostics(&mut self, parsing: bool) {
        for diagnostic in self.handler.drain() {
            if diagnostic.level == Level::Error {
                if parsing {
                    self.parse_errors = true;
                } else {
                    self.runtime_errors = true;
                }
            }
            self.log_sink.write_line(&diagnostic.render());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_util::MemorySink;

    fn interpreter() -> (Interpreter, MemorySink, MemorySink) {
        let log = MemorySink::new();
        let list = MemorySink::new();
        let interp =
            Interpreter::with_sinks(Box::new(log.clone()), Box::new(list.clone())).unwrap();
        (interp, log, list)
    }

    #[test]
    fn test_exit_code_clean_run() {
        let (mut interp, log, _) = interpreter();
        let code = interp.run_program("data t; x = 1; run;");
        assert_eq!(code, EXIT_OK);
        assert!(log.contains("The data set WORK.T has 1 observations and 1 variables."));
        assert!(log.contains("DATA statement used"));
    }

    #[test]
    fn test_exit_code_parse_errors() {
        let (mut interp, log, _) = interpreter();
        let code = interp.run_program("data ; run;\n");
        assert_eq!(code, EXIT_PARSE_ERRORS);
        assert!(log.lines().iter().any(|l| l.starts_with("ERROR:")));
    }

    #[test]
    fn test_exit_code_runtime_errors_and_continues() {
        let (mut interp, log, _) = interpreter();
        let code = interp.run_program("data a; set ghost; run;\ndata b; x = 1; run;");
        assert_eq!(code, EXIT_RUNTIME_ERRORS);
        assert!(log.contains("WORK.GHOST not found"));
        // The second step still ran.
        assert!(log.contains("The data set WORK.B has 1 observations"));
    }

    #[test]
    fn test_title_and_options_statements() {
        let (mut interp, _, list) = interpreter();
        let code = interp.run_program(
            "title 'Numbers'; options obs=1;\ndata t; x = 1; output; run;\nproc print data=t; run;",
        );
        assert_eq!(code, EXIT_OK);
        assert_eq!(list.lines()[0], "Numbers");
    }

    #[test]
    fn test_macro_let_expansion_in_step() {
        let (mut interp, _, _) = interpreter();
        let code = interp.run_program(
            "%let lim = 10;\ndata t; x = &lim + 5; run;",
        );
        assert_eq!(code, EXIT_OK);
        let ds = interp.env_mut().store.open_dataset(None, "t").unwrap();
        assert_eq!(
            ds.cell_by_name(0, "x"),
            Some(&sable_data::Cell::Num(15.0))
        );
    }

    #[test]
    fn test_unresolved_macro_var_is_runtime_error() {
        let (mut interp, log, _) = interpreter();
        let code = interp.run_program("data t; x = &nope; run;");
        assert_eq!(code, EXIT_RUNTIME_ERRORS);
        assert!(log.contains("'&nope' is not defined"));
    }

    #[test]
    fn test_macro_definition_and_call() {
        let (mut interp, _, _) = interpreter();
        let source = "\
%macro square(ds, v);
data &ds; x = &v * &v; run;
%mend;
%square(sq, 7);";
        let code = interp.run_program(source);
        assert_eq!(code, EXIT_OK);
        let ds = interp.env_mut().store.open_dataset(None, "sq").unwrap();
        assert_eq!(ds.cell_by_name(0, "x"), Some(&sable_data::Cell::Num(49.0)));
    }

    #[test]
    fn test_macro_arity_mismatch_is_runtime_error() {
        let (mut interp, log, _) = interpreter();
        let source = "%macro two(a, b); title '&a &b'; %mend;\n%two(1);";
        let code = interp.run_program(source);
        assert_eq!(code, EXIT_RUNTIME_ERRORS);
        assert!(log.contains("expects 2 argument(s), got 1"));
    }

    #[test]
    fn test_libname_missing_path_is_runtime_error() {
        let (mut interp, log, _) = interpreter();
        let code = interp.run_program("libname lab '/no/such/sable/dir';");
        assert_eq!(code, EXIT_RUNTIME_ERRORS);
        assert!(log.contains("library path does not exist"));
    }
}
