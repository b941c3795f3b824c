//! # msh
//!
//! An interactive command interpreter with POSIX job control. A line is split
//! into `;`/`&` separated jobs; each job is either a builtin (`jobs`, `history`,
//! `!N`, `bg`, `fg`, `kill`) or an external program launched as the leader of
//! its own process group. Child status changes are collected asynchronously by
//! the signal coordinator and applied to the job table on the control thread.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod system;
