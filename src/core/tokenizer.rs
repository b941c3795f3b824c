//! # Tokenizer
//!
//! Splits an input line into jobs and a job into argument words.
//!
//! A job ends at the next unescaped `;` (foreground) or `&` (background), or at
//! the end of the line (foreground). `\;` and `\&` keep the delimiter as part of
//! the job text. Spans that are empty after trimming produce no job at all.
//!
//! The scan position lives in an explicit [`Cursor`] that the caller threads
//! through [`next_job`]; [`split_jobs`] wraps that loop in a lazy iterator.

use crate::models::JobMode;
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;

/// Command names interpreted by the shell itself.
pub const BUILTIN_NAMES: &[&str] = &["jobs", "history", "bg", "fg", "kill"];

lazy_static! {
    static ref HISTORY_EXPANSION: Regex =
        Regex::new(r"^!\d+$").expect("history expansion pattern is valid");
}

/// The unscanned remainder of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    /// Places a cursor at the start of a new line.
    pub fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Text not yet consumed.
    pub fn remaining(&self) -> &'a str {
        self.rest
    }

    /// Whether nothing is left to scan.
    pub fn is_exhausted(&self) -> bool {
        self.rest.is_empty()
    }
}

/// One job cut out of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedJob<'a> {
    /// Trimmed job text; owned only when an escaped delimiter had to be unescaped.
    pub text: Cow<'a, str>,
    /// Scheduling requested by the delimiter that ended the job.
    pub mode: JobMode,
}

/// Scans the next non-empty job starting at `cursor`.
///
/// Returns the job and the cursor positioned after its delimiter, or `None`
/// once the line holds no further job.
pub fn next_job(cursor: Cursor<'_>) -> Option<(ParsedJob<'_>, Cursor<'_>)> {
    let mut cursor = cursor;
    while !cursor.is_exhausted() {
        let (span, mode, rest) = take_span(cursor.rest);
        cursor = Cursor { rest };

        let trimmed = span.trim();
        if trimmed.is_empty() {
            continue;
        }
        let job = ParsedJob {
            text: unescape_delimiters(trimmed),
            mode,
        };
        return Some((job, cursor));
    }
    None
}

/// Lazy sequence of the jobs in `line`.
pub fn split_jobs(line: &str) -> JobSplitter<'_> {
    JobSplitter {
        cursor: Some(Cursor::new(line)),
    }
}

/// Iterator returned by [`split_jobs`].
#[derive(Debug, Clone)]
pub struct JobSplitter<'a> {
    cursor: Option<Cursor<'a>>,
}

impl<'a> Iterator for JobSplitter<'a> {
    type Item = ParsedJob<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.take()?;
        let (job, rest) = next_job(cursor)?;
        self.cursor = Some(rest);
        Some(job)
    }
}

/// Finds the first unescaped delimiter. Returns the text before it, the mode it
/// selects, and the text after it.
fn take_span(text: &str) -> (&str, JobMode, &str) {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        let mode = match c {
            '\\' => {
                escaped = true;
                continue;
            }
            ';' => JobMode::Foreground,
            '&' => JobMode::Background,
            _ => continue,
        };
        let (span, tail) = text.split_at(i);
        // Both delimiters are one byte wide.
        return (span, mode, tail.get(1..).unwrap_or(""));
    }
    (text, JobMode::Foreground, "")
}

fn unescape_delimiters(text: &str) -> Cow<'_, str> {
    if text.contains("\\;") || text.contains("\\&") {
        Cow::Owned(text.replace("\\;", ";").replace("\\&", "&"))
    } else {
        Cow::Borrowed(text)
    }
}

// --- Argument splitting ---

/// The words of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments<'a> {
    /// Words in order, borrowed from the job text.
    pub words: Vec<&'a str>,
    /// Whether the first word names a builtin.
    pub is_builtin: bool,
}

impl<'a> Arguments<'a> {
    /// The command word, if any.
    pub fn command(&self) -> Option<&'a str> {
        self.words.first().copied()
    }

    /// Whether the job had no words at all.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Splits a job into words on runs of spaces and tabs. Quotes are not interpreted.
pub fn split_arguments(text: &str) -> Arguments<'_> {
    let words: Vec<&str> = text
        .split([' ', '\t'])
        .filter(|word| !word.is_empty())
        .collect();
    let is_builtin = words.first().is_some_and(|word| is_builtin(word));
    Arguments { words, is_builtin }
}

/// Whether `word` is a builtin name or a `!<digits>` history expansion.
pub fn is_builtin(word: &str) -> bool {
    BUILTIN_NAMES.contains(&word) || HISTORY_EXPANSION.is_match(word)
}
