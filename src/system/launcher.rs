// src/system/launcher.rs

use crate::{
    constants::{EXIT_EXEC_FAILED, EXIT_NOT_FOUND},
    core::{
        job_table::{JobTable, JobTableError},
        tokenizer,
    },
    models::JobMode,
    system::signals::{self, JobEvent, SignalError},
};
use nix::errno::Errno;
use nix::sys::stat::{SFlag, stat};
use nix::unistd::{AccessFlags, ForkResult, Pid, access, execv, fork, setpgid};
use std::env;
use std::ffi::{CStr, CString, NulError, OsStr};
use std::os::unix::ffi::OsStrExt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Job '{command}' was not launched: {source}")]
    TableFull {
        command: String,
        #[source]
        source: JobTableError,
    },
    #[error("Could not fork for '{command}': {source}")]
    Fork {
        command: String,
        #[source]
        source: Errno,
    },
    #[error("Command '{command}' contains a NUL byte.")]
    NulByte {
        command: String,
        #[source]
        source: NulError,
    },
    #[error("Signal handling failed: {0}")]
    Signal(#[from] SignalError),
}

/// Outcome of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launched {
    pub pid: Pid,
    pub jid: usize,
    pub mode: JobMode,
    /// Status changes applied while waiting on a foreground job.
    pub events: Vec<JobEvent>,
}

/// Everything the child needs to exec, built before the fork so the child
/// does not allocate.
#[derive(Debug)]
struct ExecPlan {
    argv: Vec<CString>,
    /// Paths to try, in order.
    candidates: Vec<CString>,
    /// Whether the candidates come from a search path and must be tested first.
    searched: bool,
    not_found_message: String,
    failure_prefix: String,
}

impl ExecPlan {
    /// `search_path` is the value of `PATH`; unset or empty means no
    /// directories are searched.
    fn new(
        words: &[&str],
        command: &str,
        search_path: Option<&OsStr>,
    ) -> Result<Self, LaunchError> {
        let nul = |source| LaunchError::NulByte {
            command: command.to_string(),
            source,
        };
        let argv = words
            .iter()
            .map(|word| CString::new(*word))
            .collect::<Result<Vec<_>, _>>()
            .map_err(nul)?;
        let program = words.first().copied().unwrap_or_default();

        let searched = !program.contains('/');
        let candidates = if searched {
            search_path
                .filter(|value| !value.is_empty())
                .map(|value| env::split_paths(value).collect::<Vec<_>>())
                .unwrap_or_default()
                .into_iter()
                .map(|dir| CString::new(dir.join(program).as_os_str().as_bytes()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(nul)?
        } else {
            vec![CString::new(program).map_err(nul)?]
        };

        Ok(Self {
            argv,
            candidates,
            searched,
            not_found_message: format!(t!("launch.error.not_found"), program = program),
            failure_prefix: format!(t!("launch.error.exec_failed"), program = program),
        })
    }

    /// Replaces the child process image. Never returns: on failure the child
    /// reports and exits with 127 (not found) or 126 (not executable).
    fn exec(&self) -> ! {
        let mut failure = None;
        for candidate in &self.candidates {
            if self.searched && !is_executable_file(candidate) {
                continue;
            }
            let Err(errno) = execv::<CString>(candidate, &self.argv);
            if !self.searched && errno == Errno::ENOENT {
                break;
            }
            failure = Some(errno);
            break;
        }

        match failure {
            Some(errno) => {
                write_stderr(self.failure_prefix.as_bytes());
                write_stderr(errno.desc().as_bytes());
                write_stderr(b"\n");
                exit_child(EXIT_EXEC_FAILED)
            }
            None => {
                write_stderr(self.not_found_message.as_bytes());
                exit_child(EXIT_NOT_FOUND)
            }
        }
    }
}

fn is_executable_file(path: &CStr) -> bool {
    let is_regular = stat(path)
        .map(|st| SFlag::from_bits_truncate(st.st_mode) & SFlag::S_IFMT == SFlag::S_IFREG)
        .unwrap_or(false);
    is_regular && access(path, AccessFlags::X_OK).is_ok()
}

fn write_stderr(bytes: &[u8]) {
    let _ = nix::unistd::write(std::io::stderr(), bytes);
}

/// Leaves the forked child without running the parent's exit handlers or
/// flushing its copied stdio buffers.
#[allow(unsafe_code)]
fn exit_child(status: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and terminates immediately.
    unsafe { nix::libc::_exit(status) }
}

/// Launches one job.
///
/// The job is recorded in the table before any status change for it can be
/// applied: `SIGCHLD` stays blocked from before the fork until the insert.
/// Foreground jobs are waited on until they exit, are killed or are stopped.
///
/// Returns `Ok(None)` when the job text holds no words.
pub fn launch(
    text: &str,
    mode: JobMode,
    table: &mut JobTable,
) -> Result<Option<Launched>, LaunchError> {
    let args = tokenizer::split_arguments(text);
    if args.is_empty() {
        return Ok(None);
    }
    let search_path = env::var_os("PATH");
    let plan = ExecPlan::new(&args.words, text, search_path.as_deref())?;

    let previous_mask = signals::block_child_signal()?;
    let restore = scopeguard::guard(previous_mask, |mask| signals::restore_mask(&mask));

    if !table.has_vacancy() {
        return Err(LaunchError::TableFull {
            command: text.to_string(),
            source: JobTableError::Full {
                capacity: table.capacity(),
            },
        });
    }

    let pid = match spawn(&plan, &restore)? {
        Some(pid) => pid,
        None => plan.exec(),
    };

    // Both sides set the group so neither depends on who runs first.
    if let Err(e) = setpgid(pid, pid) {
        log::trace!("setpgid({}) from parent: {}", pid, e);
    }

    let jid = match table.insert(pid, mode.initial_state(), text) {
        Ok(jid) => jid,
        Err(source) => {
            let _ = signals::signal_group(pid, nix::sys::signal::Signal::SIGKILL);
            return Err(LaunchError::TableFull {
                command: text.to_string(),
                source,
            });
        }
    };
    log::debug!("Launched [{}] {} ({:?}): {}", jid, pid, mode, text);
    drop(restore);

    let events = match mode {
        JobMode::Foreground => signals::wait_for_foreground(table, pid)?,
        JobMode::Background => Vec::new(),
    };

    Ok(Some(Launched {
        pid,
        jid,
        mode,
        events,
    }))
}

/// Forks. Returns the child's pid in the parent and `None` in the child,
/// which has already joined its own process group and restored its signals.
#[allow(unsafe_code)]
fn spawn(
    plan: &ExecPlan,
    original_mask: &nix::sys::signal::SigSet,
) -> Result<Option<Pid>, LaunchError> {
    // SAFETY: the child only calls async-signal-safe functions (setpgid,
    // sigaction, sigprocmask, stat, access, execv, write, _exit) on data
    // prepared before the fork.
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(Some(child)),
        Ok(ForkResult::Child) => {
            let _ = setpgid(Pid::from_raw(0), Pid::from_raw(0));
            signals::reset_child_signals(original_mask);
            Ok(None)
        }
        Err(source) => Err(LaunchError::Fork {
            command: plan.argv_display(),
            source,
        }),
    }
}

impl ExecPlan {
    fn argv_display(&self) -> String {
        self.argv
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
