//! # Signal Coordinator
//!
//! Collects child status changes asynchronously and applies them to the job
//! table on the control thread.
//!
//! The `SIGCHLD` handler never touches the job table. It reaps every available
//! status change with `waitpid(WNOHANG)` and pushes one fixed-size
//! [`ChildStatus`] per change into a bounded, lock-free queue. The control
//! thread drains that queue at its poll points (before each prompt, between
//! jobs of a line, while waiting on a foreground job) with `SIGCHLD` blocked,
//! so the queue has exactly one producer and one consumer at any moment.
//!
//! `SIGINT` and `SIGTSTP` are forwarded to the process group of the job the
//! shell is currently waiting on, if any. A suspended job is marked
//! `Suspended` only when its stop is reported, never when the signal is sent.

use crate::{
    constants::STATUS_QUEUE_CAPACITY,
    core::job_table::JobTable,
    models::{ChildStatus, Job, JobState, StatusChange},
};
use nix::errno::Errno;
use nix::sys::signal::{
    self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, killpg,
};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use signal_hook::{SigId, low_level};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, AtomicUsize, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Could not install handler for {signal}: {source}")]
    Install {
        signal: Signal,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not change the signal mask: {0}")]
    Mask(#[source] Errno),
    #[error("Could not wait for process {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
    #[error("Could not send {signal} to {pid}: {source}")]
    Delivery {
        signal: Signal,
        pid: Pid,
        #[source]
        source: Errno,
    },
}

// --- Status queue ---

const KIND_EXITED: u8 = 0;
const KIND_SIGNALED: u8 = 1;
const KIND_STOPPED: u8 = 2;
const KIND_CONTINUED: u8 = 3;

struct QueueSlot {
    pid: AtomicI32,
    kind: AtomicU8,
    detail: AtomicI32,
}

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: QueueSlot = QueueSlot {
    pid: AtomicI32::new(0),
    kind: AtomicU8::new(KIND_EXITED),
    detail: AtomicI32::new(0),
};

/// Single-producer, single-consumer ring of status changes. Usable from a
/// signal handler: no allocation, no locks.
struct StatusQueue {
    slots: [QueueSlot; STATUS_QUEUE_CAPACITY],
    /// Next slot to read. Only the consumer stores it.
    head: AtomicUsize,
    /// Next slot to write. Only the producer stores it.
    tail: AtomicUsize,
}

impl StatusQueue {
    const fn new() -> Self {
        Self {
            slots: [EMPTY_SLOT; STATUS_QUEUE_CAPACITY],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    fn is_full(&self) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head) >= STATUS_QUEUE_CAPACITY
    }

    fn push(&self, status: ChildStatus) -> bool {
        if self.is_full() {
            return false;
        }
        let tail = self.tail.load(Ordering::Relaxed);
        let Some(slot) = self.slots.get(tail % STATUS_QUEUE_CAPACITY) else {
            return false;
        };
        let (kind, detail) = match status.change {
            StatusChange::Exited(code) => (KIND_EXITED, code),
            StatusChange::Signaled(sig) => (KIND_SIGNALED, sig as i32),
            StatusChange::Stopped(sig) => (KIND_STOPPED, sig as i32),
            StatusChange::Continued => (KIND_CONTINUED, 0),
        };
        slot.pid.store(status.pid.as_raw(), Ordering::Relaxed);
        slot.kind.store(kind, Ordering::Relaxed);
        slot.detail.store(detail, Ordering::Relaxed);
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    fn pop(&self) -> Option<ChildStatus> {
        let head = self.head.load(Ordering::Relaxed);
        if head == self.tail.load(Ordering::Acquire) {
            return None;
        }
        let slot = self.slots.get(head % STATUS_QUEUE_CAPACITY)?;
        let pid = Pid::from_raw(slot.pid.load(Ordering::Relaxed));
        let kind = slot.kind.load(Ordering::Relaxed);
        let detail = slot.detail.load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(1), Ordering::Release);

        let change = match kind {
            KIND_STOPPED => Signal::try_from(detail)
                .map(StatusChange::Stopped)
                .unwrap_or(StatusChange::Stopped(Signal::SIGSTOP)),
            KIND_CONTINUED => StatusChange::Continued,
            KIND_SIGNALED => Signal::try_from(detail)
                .map(StatusChange::Signaled)
                .unwrap_or(StatusChange::Exited(128 + detail)),
            _ => StatusChange::Exited(detail),
        };
        Some(ChildStatus { pid, change })
    }
}

static STATUS_QUEUE: StatusQueue = StatusQueue::new();

/// Process group of the job the control thread is waiting on; 0 when none.
static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);

/// Held by whoever is currently calling `waitpid(-1)` to fill the queue.
static REAPER_BUSY: AtomicBool = AtomicBool::new(false);

/// Moves every available child status change into the queue.
///
/// Runs in signal-handler context: atomics, `waitpid` and nothing else.
/// Stops early when the queue is full; the remaining children stay
/// un-reaped until the control thread drains and calls this again.
fn reap_into_queue() -> usize {
    if REAPER_BUSY
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        return 0;
    }
    let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
    let mut queued = 0;
    while !STATUS_QUEUE.is_full() {
        match waitpid(Pid::from_raw(-1), Some(flags)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(status) => {
                if let Some(status) = ChildStatus::from_wait_status(status) {
                    if STATUS_QUEUE.push(status) {
                        queued += 1;
                    }
                }
            }
            Err(Errno::EINTR) => continue,
            // ECHILD: no children left.
            Err(_) => break,
        }
    }
    REAPER_BUSY.store(false, Ordering::Release);
    queued
}

fn forward_to_foreground(sig: Signal) {
    let pgid = FOREGROUND_PGID.load(Ordering::Acquire);
    if pgid > 0 {
        let _ = killpg(Pid::from_raw(pgid), sig);
    }
}

// --- Installation ---

/// Keeps the shell's signal handlers registered; unregisters them on drop.
#[derive(Debug)]
pub struct SignalCoordinator {
    ids: Vec<SigId>,
}

impl SignalCoordinator {
    /// Installs the `SIGCHLD`, `SIGINT` and `SIGTSTP` handlers.
    #[allow(unsafe_code)]
    pub fn install() -> Result<Self, SignalError> {
        let mut ids = Vec::with_capacity(3);

        // SAFETY: the reaper only uses atomics and `waitpid`, both async-signal-safe.
        let id = unsafe {
            low_level::register(signal_hook::consts::SIGCHLD, || {
                reap_into_queue();
            })
        }
        .map_err(|source| SignalError::Install {
            signal: Signal::SIGCHLD,
            source,
        })?;
        ids.push(id);

        for sig in [Signal::SIGINT, Signal::SIGTSTP] {
            // SAFETY: forwarding reads an atomic and calls `killpg`, both async-signal-safe.
            let id = unsafe { low_level::register(sig as i32, move || forward_to_foreground(sig)) }
                .map_err(|source| SignalError::Install {
                    signal: sig,
                    source,
                })?;
            ids.push(id);
        }

        log::debug!("Signal handlers installed for SIGCHLD, SIGINT, SIGTSTP.");
        Ok(Self { ids })
    }
}

impl Drop for SignalCoordinator {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            low_level::unregister(id);
        }
    }
}

// --- Masking ---

/// Blocks `SIGCHLD` for the calling thread and returns the previous mask.
pub fn block_child_signal() -> Result<SigSet, SignalError> {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set.thread_swap_mask(SigmaskHow::SIG_BLOCK)
        .map_err(SignalError::Mask)
}

/// Reinstates a mask saved by [`block_child_signal`].
pub fn restore_mask(mask: &SigSet) {
    if let Err(e) = mask.thread_set_mask() {
        log::warn!("Could not restore signal mask: {}", e);
    }
}

/// Prepares a freshly forked child for `exec`: default dispositions for the
/// signals the shell handles, and the mask the parent had before it blocked
/// `SIGCHLD` around the fork.
#[allow(unsafe_code)]
pub fn reset_child_signals(original_mask: &SigSet) {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [Signal::SIGCHLD, Signal::SIGINT, Signal::SIGTSTP] {
        // SAFETY: installing SIG_DFL carries no handler code.
        let _ = unsafe { signal::sigaction(sig, &default) };
    }
    let _ = original_mask.thread_set_mask();
}

// --- Applying status changes ---

/// A job table change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    /// The job as it was after the change; for finished jobs, the freed entry.
    pub job: Job,
    /// What happened.
    pub change: StatusChange,
}

impl JobEvent {
    /// Whether the prompt loop should announce this event. Foreground jobs
    /// that simply finish are not announced.
    pub fn is_notable(&self) -> bool {
        match self.change {
            StatusChange::Stopped(_) => true,
            StatusChange::Continued => false,
            StatusChange::Exited(_) | StatusChange::Signaled(_) => {
                self.job.state != JobState::Foreground
            }
        }
    }
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Job {
            pid,
            jid,
            command_line,
            ..
        } = &self.job;
        match self.change {
            StatusChange::Exited(_) => write!(
                f,
                t!("job.event.done"),
                jid = jid,
                command = command_line
            ),
            StatusChange::Signaled(_) => write!(
                f,
                t!("job.event.terminated"),
                jid = jid,
                command = command_line
            ),
            StatusChange::Stopped(_) => write!(
                f,
                t!("job.event.suspended"),
                jid = jid,
                pid = pid,
                command = command_line
            ),
            StatusChange::Continued => write!(f, "{}", self.job),
        }
    }
}

/// Applies one status change:
/// exited/killed removes the job, stopped marks it `Suspended`, continued
/// moves a `Suspended` job to `Background`.
pub fn apply_status(table: &mut JobTable, status: ChildStatus) -> Option<JobEvent> {
    let ChildStatus { pid, change } = status;
    log::debug!("Child {} changed state: {:?}", pid, change);

    if status.is_terminal() {
        let job = table.remove(pid)?;
        return Some(JobEvent { job, change });
    }

    let job = table.find_by_pid_mut(pid)?;
    match change {
        StatusChange::Stopped(_) if job.state != JobState::Suspended => {
            job.state = JobState::Suspended;
        }
        // `fg`/`bg` set the target state before resuming the job.
        StatusChange::Continued if job.state == JobState::Suspended => {
            job.state = JobState::Background;
        }
        _ => return None,
    }
    Some(JobEvent {
        job: job.clone(),
        change,
    })
}

/// Drains the queue into the table. The caller must have `SIGCHLD` blocked.
fn collect_events(table: &mut JobTable, events: &mut Vec<JobEvent>) {
    loop {
        while let Some(status) = STATUS_QUEUE.pop() {
            events.extend(apply_status(table, status));
        }
        if reap_into_queue() == 0 {
            break;
        }
    }
}

/// Poll point: applies every pending status change to the table.
pub fn drain(table: &mut JobTable) -> Result<Vec<JobEvent>, SignalError> {
    let previous = block_child_signal()?;
    let _restore = scopeguard::guard(previous, |mask| restore_mask(&mask));

    let mut events = Vec::new();
    collect_events(table, &mut events);
    Ok(events)
}

fn is_foreground(table: &JobTable, pid: Pid) -> bool {
    table
        .find_by_pid(pid)
        .is_some_and(|job| job.state == JobState::Foreground)
}

/// Blocks until the foreground job `pid` exits, is killed or is stopped.
///
/// While waiting, `SIGINT`/`SIGTSTP` received by the shell are forwarded to
/// the job's process group.
pub fn wait_for_foreground(table: &mut JobTable, pid: Pid) -> Result<Vec<JobEvent>, SignalError> {
    let previous = block_child_signal()?;
    let _restore = scopeguard::guard(previous, |mask| restore_mask(&mask));

    FOREGROUND_PGID.store(pid.as_raw(), Ordering::Release);
    let _clear = scopeguard::guard((), |()| FOREGROUND_PGID.store(0, Ordering::Release));
    log::debug!("Waiting for foreground job {}.", pid);

    let mut events = Vec::new();
    loop {
        collect_events(table, &mut events);
        if !is_foreground(table, pid) {
            break;
        }
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(status) => {
                if let Some(status) = ChildStatus::from_wait_status(status) {
                    events.extend(apply_status(table, status));
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                // Reaped by someone else; its record is either queued or lost.
                collect_events(table, &mut events);
                if is_foreground(table, pid) {
                    log::warn!("Foreground job {} vanished without a status.", pid);
                    events.extend(table.remove(pid).map(|job| JobEvent {
                        job,
                        change: StatusChange::Exited(0),
                    }));
                }
                break;
            }
            Err(source) => return Err(SignalError::Wait { pid, source }),
        }
    }
    Ok(events)
}

/// Shutdown: blocks until every job in the table has exited.
///
/// Suspended jobs are resumed first so they can run to completion; a job that
/// stops again while the shell is waiting is hung up.
pub fn wait_for_all(table: &mut JobTable) -> Result<Vec<JobEvent>, SignalError> {
    let previous = block_child_signal()?;
    let _restore = scopeguard::guard(previous, |mask| restore_mask(&mask));

    let mut events = Vec::new();
    collect_events(table, &mut events);

    for job in table.iter_mut().filter(|job| job.state == JobState::Suspended) {
        log::debug!("Resuming suspended job [{}] {} before exit.", job.jid, job.pid);
        if killpg(job.pid, Signal::SIGCONT).is_ok() {
            job.state = JobState::Background;
        }
    }

    while let Some(pid) = table.pids().first().copied() {
        log::debug!("Waiting for background job {} before exit.", pid);
        match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Stopped(_, sig)) => {
                log::warn!("Job {} stopped by {} during shutdown; hanging it up.", pid, sig);
                let _ = killpg(pid, Signal::SIGHUP);
                let _ = killpg(pid, Signal::SIGCONT);
            }
            Ok(status) => {
                if let Some(status) = ChildStatus::from_wait_status(status) {
                    events.extend(apply_status(table, status));
                }
            }
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                collect_events(table, &mut events);
                if let Some(job) = table.remove(pid) {
                    log::warn!("Job {} vanished without a status.", pid);
                    events.push(JobEvent {
                        job,
                        change: StatusChange::Exited(0),
                    });
                }
            }
            Err(source) => return Err(SignalError::Wait { pid, source }),
        }
    }
    Ok(events)
}

// --- Sending ---

/// Sends `signal` to every process in the group led by `pgid`.
pub fn signal_group(pgid: Pid, signal: Signal) -> Result<(), SignalError> {
    log::debug!("Sending {} to process group {}.", signal, pgid);
    killpg(pgid, signal).map_err(|source| SignalError::Delivery {
        signal,
        pid: pgid,
        source,
    })
}

/// Sends `signal` to a single process.
pub fn signal_process(pid: Pid, signal: Signal) -> Result<(), SignalError> {
    log::debug!("Sending {} to process {}.", signal, pid);
    signal::kill(pid, signal).map_err(|source| SignalError::Delivery {
        signal,
        pid,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(pid: i32, change: StatusChange) -> ChildStatus {
        ChildStatus {
            pid: Pid::from_raw(pid),
            change,
        }
    }

    #[test]
    fn test_queue_preserves_order_and_payload() {
        let queue = StatusQueue::new();
        assert!(queue.push(status(1, StatusChange::Exited(3))));
        assert!(queue.push(status(2, StatusChange::Signaled(Signal::SIGKILL))));
        assert!(queue.push(status(3, StatusChange::Stopped(Signal::SIGTSTP))));
        assert!(queue.push(status(4, StatusChange::Continued)));

        assert_eq!(queue.pop(), Some(status(1, StatusChange::Exited(3))));
        assert_eq!(queue.pop(), Some(status(2, StatusChange::Signaled(Signal::SIGKILL))));
        assert_eq!(queue.pop(), Some(status(3, StatusChange::Stopped(Signal::SIGTSTP))));
        assert_eq!(queue.pop(), Some(status(4, StatusChange::Continued)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_queue_rejects_when_full_and_wraps() {
        let queue = StatusQueue::new();
        for i in 0..STATUS_QUEUE_CAPACITY {
            let pid = i32::try_from(i).unwrap() + 1;
            assert!(queue.push(status(pid, StatusChange::Exited(0))));
        }
        assert!(!queue.push(status(999, StatusChange::Exited(0))));

        assert_eq!(queue.pop().unwrap().pid, Pid::from_raw(1));
        assert!(queue.push(status(1000, StatusChange::Exited(0))));
        let mut last = None;
        while let Some(s) = queue.pop() {
            last = Some(s.pid);
        }
        assert_eq!(last, Some(Pid::from_raw(1000)));
    }

    #[test]
    fn test_apply_state_machine() {
        let mut table = JobTable::new(2);
        let pid = Pid::from_raw(500);
        table.insert(pid, JobState::Foreground, "sleep 9").unwrap();

        let event = apply_status(&mut table, status(500, StatusChange::Stopped(Signal::SIGTSTP)))
            .unwrap();
        assert_eq!(event.job.state, JobState::Suspended);
        assert!(event.is_notable());
        assert!(table.find_foreground().is_none());

        let event = apply_status(&mut table, status(500, StatusChange::Continued)).unwrap();
        assert_eq!(event.job.state, JobState::Background);

        let event = apply_status(&mut table, status(500, StatusChange::Exited(0))).unwrap();
        assert_eq!(event.job.command_line, "sleep 9");
        assert!(event.is_notable());
        assert!(table.is_empty());
    }

    #[test]
    fn test_continue_does_not_demote_foreground() {
        let mut table = JobTable::new(1);
        let pid = Pid::from_raw(77);
        table.insert(pid, JobState::Foreground, "vi").unwrap();

        assert!(apply_status(&mut table, status(77, StatusChange::Continued)).is_none());
        assert_eq!(table.find_by_pid(pid).unwrap().state, JobState::Foreground);
    }

    #[test]
    fn test_finished_foreground_job_is_not_notable() {
        let mut table = JobTable::new(1);
        table.insert(Pid::from_raw(8), JobState::Foreground, "true").unwrap();
        let event = apply_status(&mut table, status(8, StatusChange::Exited(0))).unwrap();
        assert!(!event.is_notable());
    }

    #[test]
    fn test_event_announcements() {
        let mut table = JobTable::new(2);
        table.insert(Pid::from_raw(41), JobState::Background, "sleep 1").unwrap();
        table.insert(Pid::from_raw(42), JobState::Foreground, "vi notes").unwrap();

        let stopped = apply_status(&mut table, status(42, StatusChange::Stopped(Signal::SIGTSTP)))
            .unwrap();
        assert_eq!(stopped.to_string(), "[2] 42 Suspended vi notes");

        let done = apply_status(&mut table, status(41, StatusChange::Exited(0))).unwrap();
        assert_eq!(done.to_string(), "[1] Done sleep 1");

        let killed = apply_status(&mut table, status(42, StatusChange::Signaled(Signal::SIGTERM)))
            .unwrap();
        assert_eq!(killed.to_string(), "[2] Terminated vi notes");
    }

    #[test]
    fn test_unknown_pid_is_ignored() {
        let mut table = JobTable::new(1);
        assert!(apply_status(&mut table, status(31337, StatusChange::Exited(1))).is_none());
        assert!(apply_status(&mut table, status(31337, StatusChange::Continued)).is_none());
        assert!(table.is_empty());
    }
}
