// src/cli/handlers/mod.rs

// One module per builtin; `commons` holds argument parsing they share.

pub mod bgfg;
pub mod commons;
pub mod history;
pub mod jobs;
pub mod kill;
