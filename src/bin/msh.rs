// src/bin/msh.rs

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use colored::*;
use msh::{
    cli::{Cli, repl},
    constants::USAGE,
    core::config_loader,
    state::ShellState,
    system::signals::SignalCoordinator,
};
use std::io;

/// Sets up logging, resolves the configuration, then hands the terminal to the
/// prompt loop. Only configuration errors end the process early.
fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            log::debug!("Rejected startup flags: {}", e);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };
    log::debug!("CLI args parsed: {:?}", cli);

    let settings = match config_loader::load_settings(&cli.into_overrides()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_shell(&settings) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_shell(settings: &config_loader::Settings) -> Result<()> {
    let mut state =
        ShellState::from_settings(settings).context(msh::t!("main.error.state"))?;
    let _signals = SignalCoordinator::install().context(msh::t!("main.error.signals"))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    repl::run(&mut state, &mut input, &mut out)
}
