use crate::core::config_loader::Overrides;
use clap::Parser;
use std::path::PathBuf;

pub mod dispatcher;
pub mod handlers;
pub mod repl;

/// msh: an interactive shell with job control.
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Cli {
    /// Number of history entries to keep.
    #[arg(short = 's', long = "history-size", value_name = "NUMBER",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub history_size: Option<u32>,

    /// Maximum number of simultaneous jobs.
    #[arg(short = 'j', long = "max-jobs", value_name = "NUMBER",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_jobs: Option<u32>,

    /// Maximum input line length, in characters.
    #[arg(short = 'l', long = "max-line", value_name = "NUMBER",
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_line: Option<u32>,

    /// History file to load at startup and rewrite at exit.
    #[arg(long, value_name = "PATH", conflicts_with = "no_history_file")]
    pub history_file: Option<PathBuf>,

    /// Keep history in memory only.
    #[arg(long)]
    pub no_history_file: bool,
}

impl Cli {
    /// The flags as the highest-priority configuration layer.
    pub fn into_overrides(self) -> Overrides {
        let widen = |value: Option<u32>| value.and_then(|v| usize::try_from(v).ok());
        Overrides {
            max_jobs: widen(self.max_jobs),
            max_line: widen(self.max_line),
            max_history: widen(self.history_size),
            history_file: self.history_file,
            no_history_file: self.no_history_file,
        }
    }
}
