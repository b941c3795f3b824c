// src/cli/dispatcher.rs

use crate::{
    cli::handlers,
    state::ShellState,
    system::signals::{JobEvent, SignalError},
};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuiltinError {
    #[error("{command}: no such job %{jid}")]
    JobNotFound { command: String, jid: usize },
    #[error("{command}: malformed job id '{token}', expected %<jid>")]
    MalformedJobId { command: String, token: String },
    #[error("{command}: missing job id, expected %<jid>")]
    MissingJobId { command: String },
    #[error("!{index}: history entry out of range (1-{len})")]
    HistoryOutOfRange { index: String, len: usize },
    #[error("!{index}: a recalled line cannot recall another history entry")]
    NestedHistoryExpansion { index: String },
    #[error("kill: invalid signal '{token}'")]
    InvalidSignal { token: String },
    #[error("kill: signal {number} is not allowed (use 2, 15, 18 or 19)")]
    SignalNotAllowed { number: i32 },
    #[error("kill: invalid pid '{token}'")]
    InvalidPid { token: String },
    #[error("usage: {usage}")]
    Usage { usage: &'static str },
    #[error("{0}")]
    Delivery(#[source] SignalError),
    #[error("{0}")]
    Wait(#[source] SignalError),
    #[error("Could not write output: {0}")]
    Output(#[from] io::Error),
}

/// What the evaluator should do after a builtin ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuiltinOutcome {
    /// Nothing further.
    Done,
    /// The builtin waited on a job; these status changes were applied meanwhile.
    Waited(Vec<JobEvent>),
    /// Evaluate this line next (history recall).
    Rerun(String),
}

type Handler = fn(&[&str], &mut ShellState, &mut dyn Write) -> Result<BuiltinOutcome, BuiltinError>;

/// Defines a builtin command and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: Handler,
}

/// The single source of truth for all builtins except `!N`, which is matched
/// by pattern.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "jobs",
        aliases: &[],
        handler: handlers::jobs::handle,
    },
    CommandDefinition {
        name: "history",
        aliases: &[],
        handler: handlers::history::handle,
    },
    CommandDefinition {
        name: "bg",
        aliases: &[],
        handler: handlers::bgfg::handle_bg,
    },
    CommandDefinition {
        name: "fg",
        aliases: &[],
        handler: handlers::bgfg::handle_fg,
    },
    CommandDefinition {
        name: "kill",
        aliases: &[],
        handler: handlers::kill::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Runs the builtin named by `argv[0]`.
///
/// Returns `Ok(None)` when `argv` does not name a builtin, leaving the job to
/// the launcher.
pub fn execute(
    argv: &[&str],
    state: &mut ShellState,
    out: &mut dyn Write,
) -> Result<Option<BuiltinOutcome>, BuiltinError> {
    let Some(name) = argv.first() else {
        return Ok(None);
    };
    log::debug!("Dispatching builtin: {:?}", argv);

    if let Some(command) = find_command(name) {
        return (command.handler)(argv, state, out).map(Some);
    }
    if let Some(index) = name.strip_prefix('!') {
        if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
            return handlers::history::recall(index, state).map(Some);
        }
    }
    Ok(None)
}
