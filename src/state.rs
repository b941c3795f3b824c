// src/state.rs

use crate::{
    constants::DEFAULT_PROMPT,
    core::{
        config_loader::Settings,
        history::{History, HistoryError},
        job_table::JobTable,
    },
    models::Limits,
    system::signals::{self, JobEvent, SignalError},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// The shell's explicit context: configured limits, the job table and the
/// history store. Created once at startup and passed to every component.
#[derive(Debug)]
pub struct ShellState {
    pub limits: Limits,
    pub jobs: JobTable,
    pub history: History,
    pub prompt: String,
}

impl ShellState {
    /// A state with in-memory history and the default prompt.
    pub fn new(limits: Limits) -> Self {
        Self {
            jobs: JobTable::new(limits.max_jobs),
            history: History::new(limits.max_history),
            prompt: DEFAULT_PROMPT.to_string(),
            limits,
        }
    }

    /// Builds the state from resolved settings, loading the history file if one
    /// is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, StateError> {
        let limits = settings.limits;
        let history = match &settings.history_file {
            Some(path) => History::load(path, limits.max_history)?,
            None => History::new(limits.max_history),
        };
        log::debug!(
            "Shell state created: max_jobs={}, max_line={}, max_history={}",
            limits.max_jobs,
            limits.max_line,
            limits.max_history
        );
        Ok(Self {
            jobs: JobTable::new(limits.max_jobs),
            history,
            prompt: settings.prompt.clone(),
            limits,
        })
    }

    /// Tears the state down: waits for every remaining job, then persists the
    /// history. Returns the status changes observed while waiting.
    pub fn shutdown(&mut self) -> Result<Vec<JobEvent>, StateError> {
        log::debug!("Shutting down with {} job(s) left.", self.jobs.len());
        let events = signals::wait_for_all(&mut self.jobs)?;
        self.history.save()?;
        Ok(events)
    }
}
