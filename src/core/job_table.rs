//! # Job Table
//!
//! Fixed-capacity registry of active jobs. Slots are scanned linearly; the
//! capacity is small (tens) so no index is kept. A job's `jid` is the 1-based
//! index of its slot and is reused once the slot is freed.

use crate::models::{Job, JobState};
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobTableError {
    #[error("The job table is full ({capacity} jobs).")]
    Full { capacity: usize },
}

/// Registry of at most `capacity` live jobs.
#[derive(Debug, Clone)]
pub struct JobTable {
    slots: Vec<Job>,
}

impl JobTable {
    /// Creates a table with `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Job::vacant()).collect(),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether every slot is free.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Job::is_empty)
    }

    /// Whether at least one slot is free.
    pub fn has_vacancy(&self) -> bool {
        self.slots.iter().any(Job::is_empty)
    }

    /// Records a job in the first free slot and returns its jid.
    ///
    /// Fails without touching the table when every slot is occupied.
    pub fn insert(
        &mut self,
        pid: Pid,
        state: JobState,
        command_line: &str,
    ) -> Result<usize, JobTableError> {
        let capacity = self.capacity();
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.is_empty())
            .ok_or(JobTableError::Full { capacity })?;

        let jid = index + 1;
        *slot = Job {
            pid,
            jid,
            state,
            command_line: command_line.to_string(),
        };
        log::trace!("Job table: [{}] {} inserted as {}", jid, pid, state);
        Ok(jid)
    }

    /// Frees the slot holding `pid` and hands back the job that occupied it.
    /// Returns `None`, leaving the table as it was, when no live job has that pid.
    pub fn remove(&mut self, pid: Pid) -> Option<Job> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| !slot.is_empty() && slot.pid == pid)?;
        let job = std::mem::replace(slot, Job::vacant());
        log::trace!("Job table: [{}] {} removed", job.jid, job.pid);
        Some(job)
    }

    /// Looks up a live job by process id.
    pub fn find_by_pid(&self, pid: Pid) -> Option<&Job> {
        self.iter().find(|job| job.pid == pid)
    }

    /// Mutable variant of [`JobTable::find_by_pid`].
    pub fn find_by_pid_mut(&mut self, pid: Pid) -> Option<&mut Job> {
        self.iter_mut().find(|job| job.pid == pid)
    }

    /// Looks up a live job by job id.
    pub fn find_by_jid(&self, jid: usize) -> Option<&Job> {
        jid.checked_sub(1)
            .and_then(|index| self.slots.get(index))
            .filter(|job| !job.is_empty())
    }

    /// The job the shell is currently waiting on, if any.
    pub fn find_foreground(&self) -> Option<&Job> {
        self.iter().find(|job| job.state == JobState::Foreground)
    }

    /// Changes the state of the job holding `pid`. Returns whether it was found.
    pub fn set_state(&mut self, pid: Pid, state: JobState) -> bool {
        match self.find_by_pid_mut(pid) {
            Some(job) => {
                log::trace!("Job table: [{}] {} {} -> {}", job.jid, pid, job.state, state);
                job.state = state;
                true
            }
            None => false,
        }
    }

    /// Occupied slots in jid order.
    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.slots.iter().filter(|job| !job.is_empty())
    }

    /// Mutable iterator over occupied slots in jid order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.slots.iter_mut().filter(|job| !job.is_empty())
    }

    /// Process ids of every live job.
    pub fn pids(&self) -> Vec<Pid> {
        self.iter().map(|job| job.pid).collect()
    }
}
