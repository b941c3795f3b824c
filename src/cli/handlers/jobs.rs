// src/cli/handlers/jobs.rs

use crate::{
    cli::dispatcher::{BuiltinError, BuiltinOutcome},
    state::ShellState,
};
use std::io::Write;

/// Lists every live job as `[jid] pid state command`.
pub fn handle(
    _args: &[&str],
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<BuiltinOutcome, BuiltinError> {
    for job in state.jobs.iter() {
        writeln!(out, "{}", job)?;
    }
    Ok(BuiltinOutcome::Done)
}
