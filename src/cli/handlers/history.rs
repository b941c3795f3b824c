// src/cli/handlers/history.rs

use crate::{
    cli::dispatcher::{BuiltinError, BuiltinOutcome},
    state::ShellState,
};
use std::io::Write;

/// Prints the stored lines, oldest first, numbered from 1.
pub fn handle(
    _args: &[&str],
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<BuiltinOutcome, BuiltinError> {
    for (number, line) in state.history.entries() {
        writeln!(out, "{:>5}\t{}", number, line)?;
    }
    Ok(BuiltinOutcome::Done)
}

/// `!N`: hands history entry `N` back for evaluation.
pub fn recall(index: &str, state: &ShellState) -> Result<BuiltinOutcome, BuiltinError> {
    let out_of_range = || BuiltinError::HistoryOutOfRange {
        index: index.to_string(),
        len: state.history.len(),
    };
    let number: usize = index.parse().map_err(|_| out_of_range())?;
    let line = state.history.get(number).ok_or_else(out_of_range)?;
    log::debug!("History entry {} recalled: {}", number, line);
    Ok(BuiltinOutcome::Rerun(line.to_string()))
}
