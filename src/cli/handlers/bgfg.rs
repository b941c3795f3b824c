// src/cli/handlers/bgfg.rs

use crate::{
    cli::{
        dispatcher::{BuiltinError, BuiltinOutcome},
        handlers::commons,
    },
    models::JobState,
    state::ShellState,
    system::signals,
};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::io::Write;

/// `fg %J`: resumes job `J` and waits on it as the foreground job.
pub fn handle_fg(
    args: &[&str],
    state: &mut ShellState,
    _out: &mut dyn Write,
) -> Result<BuiltinOutcome, BuiltinError> {
    let pid = resume(args, state, JobState::Foreground)?;
    let events =
        signals::wait_for_foreground(&mut state.jobs, pid).map_err(BuiltinError::Wait)?;
    Ok(BuiltinOutcome::Waited(events))
}

/// `bg %J`: resumes job `J` in the background and prints its new status.
pub fn handle_bg(
    args: &[&str],
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<BuiltinOutcome, BuiltinError> {
    let pid = resume(args, state, JobState::Background)?;
    if let Some(job) = state.jobs.find_by_pid(pid) {
        writeln!(out, "{}", job)?;
    }
    Ok(BuiltinOutcome::Done)
}

/// Moves the job to `target` and sends `SIGCONT` to its group.
///
/// The state is set before the signal so the resulting "continued"
/// notification finds the job already out of `Suspended`.
fn resume(args: &[&str], state: &mut ShellState, target: JobState) -> Result<Pid, BuiltinError> {
    let command = args.first().copied().unwrap_or_default();
    let job = commons::resolve_job(command, args.get(1).copied(), &state.jobs)?;
    let (pid, previous) = (job.pid, job.state);

    state.jobs.set_state(pid, target);
    if let Err(e) = signals::signal_group(pid, Signal::SIGCONT) {
        state.jobs.set_state(pid, previous);
        return Err(BuiltinError::Delivery(e));
    }
    log::debug!("Job {} resumed as {}.", pid, target);
    Ok(pid)
}
