//! sable - command-line front end for the Sable interpreter.
//!
//! With a program file argument the file is executed in batch mode; with
//! no argument a line-oriented REPL starts. The log stream (NOTE/WARNING/
//! ERROR) goes to stderr, listing output (PROC PRINT and friends) to
//! stdout.

mod repl;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use sable_eng::Interpreter;

#[derive(Parser)]
#[command(
    name = "sable",
    version,
    about = "Interpreter for the Sable data-step language"
)]
struct Cli {
    /// Program file to execute; omit to start the REPL
    program: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    // A second init only happens in tests; ignore it.
    let _ = simple_logger::init_with_level(level);

    match run(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.program {
        Some(path) => {
            let source = fs::read_to_string(&path)
                .with_context(|| format!("cannot read program file {}", path.display()))?;
            let mut interpreter = Interpreter::new()?;
            Ok(interpreter.run_program(&source))
        }
        None => repl::run(),
    }
}
