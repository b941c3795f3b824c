//! # Evaluator
//!
//! Runs one input line: splits it into jobs, and for each job either
//! dispatches a builtin or launches an external program, waiting on it when
//! it is a foreground job. Pending status changes are applied before each job
//! so builtins always see the current table.
//!
//! A failure in one job is reported and the rest of the line still runs.

use crate::{
    cli::dispatcher::{self, BuiltinError, BuiltinOutcome},
    constants::EXIT_COMMAND,
    core::tokenizer,
    models::JobMode,
    state::ShellState,
    system::{
        launcher::{self, LaunchError},
        signals::{self, JobEvent, SignalError},
    },
};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("Line too long: {length} characters (max {max}).")]
    LineTooLong { length: usize, max: usize },
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error("Could not write output: {0}")]
    Output(#[from] io::Error),
}

/// What happened while evaluating a line.
#[derive(Debug, Default)]
pub struct EvalReport {
    /// `exit` appeared as one of the line's jobs.
    pub exit_requested: bool,
    /// Per-job failures, in order. None of them stopped the line.
    pub failures: Vec<EvalError>,
}

impl EvalReport {
    fn merge(&mut self, other: EvalReport) {
        self.exit_requested |= other.exit_requested;
        self.failures.extend(other.failures);
    }
}

/// Evaluates one line typed at the prompt.
///
/// Fails as a whole only when the line exceeds `max_line` characters; in that
/// case nothing is run.
pub fn evaluate(
    state: &mut ShellState,
    line: &str,
    out: &mut dyn Write,
) -> Result<EvalReport, EvalError> {
    let length = line.chars().count();
    if length > state.limits.max_line {
        return Err(EvalError::LineTooLong {
            length,
            max: state.limits.max_line,
        });
    }
    Ok(evaluate_line(state, line, out, false))
}

/// `recalled` is set for a line produced by `!N`; such a line may not recall
/// history again.
fn evaluate_line(
    state: &mut ShellState,
    line: &str,
    out: &mut dyn Write,
    recalled: bool,
) -> EvalReport {
    let mut report = EvalReport::default();

    for job in tokenizer::split_jobs(line) {
        if let Err(e) = poll(state, out) {
            report.failures.push(e);
        }

        let args = tokenizer::split_arguments(&job.text);
        let Some(command) = args.command() else {
            continue;
        };
        if command == EXIT_COMMAND {
            log::debug!("exit requested.");
            report.exit_requested = true;
            continue;
        }

        let result = if args.is_builtin {
            run_builtin(state, &args.words, out, recalled)
        } else {
            run_external(state, &job.text, job.mode, out)
        };
        match result {
            Ok(Some(nested)) => report.merge(nested),
            Ok(None) => {}
            Err(e) => {
                log::debug!("Job '{}' failed: {}", job.text, e);
                report.failures.push(e);
            }
        }
    }
    report
}

fn run_builtin(
    state: &mut ShellState,
    words: &[&str],
    out: &mut dyn Write,
    recalled: bool,
) -> Result<Option<EvalReport>, EvalError> {
    if recalled {
        if let Some(index) = words.first().and_then(|word| word.strip_prefix('!')) {
            return Err(BuiltinError::NestedHistoryExpansion {
                index: index.to_string(),
            }
            .into());
        }
    }

    match dispatcher::execute(words, state, out)? {
        Some(BuiltinOutcome::Rerun(line)) => {
            writeln!(out, "{}", line)?;
            Ok(Some(evaluate_line(state, &line, out, true)))
        }
        Some(BuiltinOutcome::Waited(events)) => {
            announce(&events, out)?;
            Ok(None)
        }
        Some(BuiltinOutcome::Done) | None => Ok(None),
    }
}

fn run_external(
    state: &mut ShellState,
    text: &str,
    mode: JobMode,
    out: &mut dyn Write,
) -> Result<Option<EvalReport>, EvalError> {
    let Some(launched) = launcher::launch(text, mode, &mut state.jobs)? else {
        return Ok(None);
    };
    if launched.mode == JobMode::Background {
        writeln!(
            out,
            t!("job.launched.background"),
            jid = launched.jid,
            pid = launched.pid
        )?;
    }
    announce(&launched.events, out)?;
    Ok(None)
}

/// Poll point: applies pending status changes and announces the notable ones.
pub fn poll(state: &mut ShellState, out: &mut dyn Write) -> Result<(), EvalError> {
    let events = signals::drain(&mut state.jobs)?;
    announce(&events, out)
}

fn announce(events: &[JobEvent], out: &mut dyn Write) -> Result<(), EvalError> {
    for event in events.iter().filter(|event| event.is_notable()) {
        writeln!(out, "{}", event)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Limits;

    fn state() -> ShellState {
        ShellState::new(Limits {
            max_jobs: 2,
            max_line: 16,
            max_history: 5,
        })
    }

    #[test]
    fn test_line_too_long_is_rejected_before_running() {
        let mut state = state();
        let mut out = Vec::new();
        let result = evaluate(&mut state, "history; history; history", &mut out);
        assert!(matches!(
            result,
            Err(EvalError::LineTooLong { length: 25, max: 16 })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn test_exit_anywhere_requests_exit() {
        let mut state = state();
        let mut out = Vec::new();
        let report = evaluate(&mut state, "exit; history", &mut out).unwrap();
        assert!(report.exit_requested);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_failures_do_not_stop_the_line() {
        // --- Setup ---
        let mut state = state();
        state.history.add("history");
        let mut out = Vec::new();

        // --- Execute ---
        let report = evaluate(&mut state, "fg %1; history", &mut out).unwrap();

        // --- Assert ---
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures.first(),
            Some(EvalError::Builtin(BuiltinError::JobNotFound { jid: 1, .. }))
        ));
        assert_eq!(String::from_utf8(out).unwrap(), "    1\thistory\n");
    }

    #[test]
    fn test_recall_reevaluates_line_once() {
        let mut state = state();
        state.history.add("history");
        state.history.add("!1");
        let mut out = Vec::new();

        let report = evaluate(&mut state, "!1", &mut out).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "history\n    1\thistory\n    2\t!1\n"
        );

        let mut out = Vec::new();
        let report = evaluate(&mut state, "!2", &mut out).unwrap();
        assert!(matches!(
            report.failures.first(),
            Some(EvalError::Builtin(BuiltinError::NestedHistoryExpansion { .. }))
        ));
    }
}
