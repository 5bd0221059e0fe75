//! SUKL search CLI library exports.
//!
//! This crate provides the `sukl-search` binary over the drug, pharmacy and
//! document catalogs.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Settings, logging and command dispatch

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands, DocumentCommands, DrugCommands, PharmacyCommands};
pub use commands::{
    execute, exit_code, init_logging, load_settings, run, user_message, Catalogs, Output,
    EXIT_NOT_FOUND,
};
