// src/cli/handlers/kill.rs

use crate::{
    cli::dispatcher::{BuiltinError, BuiltinOutcome},
    state::ShellState,
    system::signals,
};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::io::Write;

const USAGE: &str = "kill <signal-number> <pid>";

/// Signals `kill` may send: interrupt, terminate, continue, stop.
const ALLOWED_SIGNALS: &[Signal] = &[
    Signal::SIGINT,
    Signal::SIGTERM,
    Signal::SIGCONT,
    Signal::SIGSTOP,
];

/// `kill SIG PID`. The job table is not touched here; the resulting status
/// change reaches it through the reaper like any other.
pub fn handle(
    args: &[&str],
    _state: &mut ShellState,
    _out: &mut dyn Write,
) -> Result<BuiltinOutcome, BuiltinError> {
    let (Some(sig_token), Some(pid_token), None) = (args.get(1), args.get(2), args.get(3)) else {
        return Err(BuiltinError::Usage { usage: USAGE });
    };
    let signal = parse_signal(sig_token)?;
    let pid = parse_pid(pid_token)?;

    signals::signal_process(pid, signal).map_err(BuiltinError::Delivery)?;
    Ok(BuiltinOutcome::Done)
}

fn parse_signal(token: &str) -> Result<Signal, BuiltinError> {
    let number: i32 = token.parse().map_err(|_| BuiltinError::InvalidSignal {
        token: token.to_string(),
    })?;
    Signal::try_from(number)
        .ok()
        .filter(|signal| ALLOWED_SIGNALS.contains(signal))
        .ok_or(BuiltinError::SignalNotAllowed { number })
}

fn parse_pid(token: &str) -> Result<Pid, BuiltinError> {
    token
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
        .map(Pid::from_raw)
        .ok_or_else(|| BuiltinError::InvalidPid {
            token: token.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Limits;

    #[test]
    fn test_allow_list() {
        assert_eq!(parse_signal("2").unwrap(), Signal::SIGINT);
        assert_eq!(parse_signal("15").unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal("18").unwrap(), Signal::SIGCONT);
        assert_eq!(parse_signal("19").unwrap(), Signal::SIGSTOP);
        assert!(matches!(
            parse_signal("9"),
            Err(BuiltinError::SignalNotAllowed { number: 9 })
        ));
        assert!(matches!(
            parse_signal("TERM"),
            Err(BuiltinError::InvalidSignal { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_pid_and_arity() {
        let mut state = ShellState::new(Limits::default());
        let mut out = Vec::new();
        assert!(matches!(parse_pid("0"), Err(BuiltinError::InvalidPid { .. })));
        assert!(matches!(parse_pid("-5"), Err(BuiltinError::InvalidPid { .. })));
        assert!(matches!(
            handle(&["kill", "15"], &mut state, &mut out),
            Err(BuiltinError::Usage { .. })
        ));
        assert!(matches!(
            handle(&["kill", "15", "1", "2"], &mut state, &mut out),
            Err(BuiltinError::Usage { .. })
        ));
    }

    #[test]
    fn test_delivery_failure_is_reported() {
        let mut state = ShellState::new(Limits::default());
        let mut out = Vec::new();
        // Above any kernel's pid_max.
        let pid = i32::MAX.to_string();
        let result = handle(&["kill", "15", &pid], &mut state, &mut out);
        assert!(matches!(
            result,
            Err(BuiltinError::Delivery(signals::SignalError::Delivery {
                signal: Signal::SIGTERM,
                ..
            }))
        ));
        assert!(state.jobs.is_empty());
    }
}
