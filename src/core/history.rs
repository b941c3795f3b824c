//! # History Store
//!
//! Bounded FIFO of previously submitted lines, optionally backed by a
//! newline-delimited file (most recent last) that is read at startup and
//! rewritten at shutdown.

use crate::constants::EXIT_COMMAND;
use std::collections::VecDeque;
use std::fs;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Could not read history file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not write history file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The most recent `capacity` non-empty, non-`exit` lines, oldest first.
#[derive(Debug, Clone)]
pub struct History {
    lines: VecDeque<String>,
    capacity: usize,
    path: Option<PathBuf>,
}

impl History {
    /// An in-memory history that is never persisted.
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            path: None,
        }
    }

    /// Loads the history file at `path`, keeping its last `capacity` lines.
    /// A missing file yields an empty history bound to that path.
    pub fn load(path: &Path, capacity: usize) -> Result<Self, HistoryError> {
        let mut history = Self::new(capacity);
        history.path = Some(path.to_path_buf());

        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No history file at '{}', starting empty.", path.display());
                return Ok(history);
            }
            Err(e) => {
                return Err(HistoryError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            }
        };

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| HistoryError::Read {
                path: path.display().to_string(),
                source: e,
            })?;
            history.add(&line);
        }
        log::debug!(
            "Loaded {} history entries from '{}'.",
            history.len(),
            path.display()
        );
        Ok(history)
    }

    /// Appends a submitted line, evicting the oldest entry when full.
    /// Empty lines and `exit` are not recorded.
    pub fn add(&mut self, line: &str) {
        if line.trim().is_empty() || line == EXIT_COMMAND || self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// The entry shown as number `index` (1-based) by `history`.
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }

    /// Entries with their 1-based numbers, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_str()))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rewrites the history file with the current entries. No-op for an
    /// in-memory history.
    pub fn save(&self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let write_err = |source| HistoryError::Write {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let mut contents = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            contents.push_str(line);
            contents.push('\n');
        }
        let mut file = fs::File::create(path).map_err(write_err)?;
        file.write_all(contents.as_bytes()).map_err(write_err)?;
        log::debug!("Saved {} history entries to '{}'.", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_skips_empty_and_exit() {
        let mut history = History::new(5);
        history.add("");
        history.add("   ");
        history.add("exit");
        history.add("ls");
        assert_eq!(history.len(), 1);
        assert_eq!(history.get(1), Some("ls"));
    }

    #[test]
    fn test_oldest_entry_evicted_first() {
        let mut history = History::new(3);
        for line in ["a", "b", "c", "d", "e"] {
            history.add(line);
        }
        let entries: Vec<(usize, &str)> = history.entries().collect();
        assert_eq!(entries, vec![(1, "c"), (2, "d"), (3, "e")]);
    }

    #[test]
    fn test_get_out_of_range() {
        let mut history = History::new(3);
        history.add("a");
        assert_eq!(history.get(0), None);
        assert_eq!(history.get(2), None);
        assert_eq!(history.get(1), Some("a"));
    }

    #[test]
    fn test_round_trip_through_file() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(".msh_history");

        let mut history = History::load(&path, 4).unwrap();
        assert!(history.is_empty());
        for line in ["one", "two", "exit", "three"] {
            history.add(line);
        }

        // --- Execute ---
        history.save().unwrap();
        let reloaded = History::load(&path, 4).unwrap();

        // --- Assert ---
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
        let entries: Vec<&str> = reloaded.entries().map(|(_, line)| line).collect();
        assert_eq!(entries, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_load_keeps_most_recent_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "1\n2\n3\n4\n5\n").unwrap();

        let history = History::load(&path, 2).unwrap();
        assert_eq!(history.get(1), Some("4"));
        assert_eq!(history.get(2), Some("5"));

        history.save().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "4\n5\n");
    }

    #[test]
    fn test_in_memory_history_does_not_persist() {
        let mut history = History::new(2);
        history.add("ls");
        assert!(history.save().is_ok());
        assert_eq!(history.get(1), Some("ls"));
    }
}
