// src/models.rs

use crate::constants::{DEFAULT_MAX_HISTORY, DEFAULT_MAX_JOBS, DEFAULT_MAX_LINE};
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use std::fmt;

// --- JOB MODELS ---

/// Scheduling state of a job table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The shell is blocked waiting on this job.
    Foreground,
    /// Running without the shell waiting on it.
    Background,
    /// Stopped by a signal; resumable with `bg`/`fg`.
    Suspended,
    /// The slot is free.
    Empty,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Foreground => "Foreground",
            Self::Background => "Background",
            Self::Suspended => "Suspended",
            Self::Empty => "Empty",
        };
        f.write_str(name)
    }
}

/// How a job produced by the tokenizer is to be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobMode {
    /// Ended by `;` or the end of the line: the shell waits for it.
    Foreground,
    /// Ended by `&`: the shell does not wait.
    Background,
}

impl JobMode {
    /// The job table state a freshly launched job starts in.
    pub fn initial_state(self) -> JobState {
        match self {
            Self::Foreground => JobState::Foreground,
            Self::Background => JobState::Background,
        }
    }
}

/// One slot of the job table.
///
/// A vacant slot has state [`JobState::Empty`], pid 0 and jid 0. An occupied
/// slot owns exactly one copy of the command line it was launched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Process id, also the id of the process group the job leads.
    pub pid: Pid,
    /// 1-based index of the slot this job occupies.
    pub jid: usize,
    /// Current scheduling state.
    pub state: JobState,
    /// The job text as typed, used by `jobs` and for notifications.
    pub command_line: String,
}

impl Job {
    /// A free slot.
    pub fn vacant() -> Self {
        Self {
            pid: Pid::from_raw(0),
            jid: 0,
            state: JobState::Empty,
            command_line: String::new(),
        }
    }

    /// Whether this slot is free.
    pub fn is_empty(&self) -> bool {
        self.state == JobState::Empty
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {} {}", self.jid, self.pid, self.state, self.command_line)
    }
}

// --- LIMITS ---

/// Size limits fixed for the lifetime of a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Capacity of the job table.
    pub max_jobs: usize,
    /// Longest accepted input line, in characters.
    pub max_line: usize,
    /// Number of history entries kept.
    pub max_history: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_jobs: DEFAULT_MAX_JOBS,
            max_line: DEFAULT_MAX_LINE,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

// --- CHILD STATUS RECORDS ---

/// What happened to a child, as reported by `waitpid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    /// The process exited with the given status.
    Exited(i32),
    /// The process was terminated by a signal.
    Signaled(Signal),
    /// The process was stopped by a signal.
    Stopped(Signal),
    /// A stopped process was resumed.
    Continued,
}

/// A single, allocation-free status change for one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildStatus {
    /// The child the change belongs to.
    pub pid: Pid,
    /// The change itself.
    pub change: StatusChange,
}

impl ChildStatus {
    /// Converts a `waitpid` result; `None` for results that carry no change
    /// (`StillAlive`, ptrace events).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        let (pid, change) = match status {
            WaitStatus::Exited(pid, code) => (pid, StatusChange::Exited(code)),
            WaitStatus::Signaled(pid, signal, _) => (pid, StatusChange::Signaled(signal)),
            WaitStatus::Stopped(pid, signal) => (pid, StatusChange::Stopped(signal)),
            WaitStatus::Continued(pid) => (pid, StatusChange::Continued),
            _ => return None,
        };
        Some(Self { pid, change })
    }

    /// Whether the child is gone for good.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.change,
            StatusChange::Exited(_) | StatusChange::Signaled(_)
        )
    }
}
