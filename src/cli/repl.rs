// src/cli/repl.rs

use crate::{
    core::evaluator::{self, EvalError},
    state::ShellState,
};
use anyhow::{Context, Result};
use colored::*;
use std::io::{self, BufRead, Write};

/// Reads lines until `exit` or end of input, evaluating each one, then shuts
/// the state down.
pub fn run(state: &mut ShellState, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
    let mut line = String::new();
    loop {
        if let Err(e) = evaluator::poll(state, out) {
            report(&e);
        }
        write!(out, "{}", state.prompt)?;
        out.flush()?;

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                writeln!(out)?;
                log::debug!("End of input.");
                break;
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context(t!("repl.error.read")),
        }
        let submitted = line.strip_suffix('\n').unwrap_or(&line);

        match evaluator::evaluate(state, submitted, out) {
            Ok(report) => {
                for failure in &report.failures {
                    self::report(failure);
                }
                state.history.add(submitted);
                if report.exit_requested {
                    break;
                }
            }
            Err(e) => self::report(&e),
        }
    }

    let events = state.shutdown().context(t!("repl.error.shutdown"))?;
    log::debug!("{} status change(s) collected during shutdown.", events.len());
    Ok(())
}

fn report(error: &EvalError) {
    eprintln!("{}: {}", "Error".red().bold(), error);
}
