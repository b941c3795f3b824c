// src/core/mod.rs

pub mod config_loader;
pub mod evaluator;
pub mod history;
pub mod job_table;
pub mod paths;
pub mod tokenizer;
