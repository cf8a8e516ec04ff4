//! CLI module for aerokeeper
//!
//! Provides command-line interface for:
//! - reconcile: Register or reconcile with the monitor, then grant access
//! - ensure-hba: Grant local network access only
//! - add-formation: Register into one more formation
//! - show-state: Print the persisted node state

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command, HbaArgs};
pub use commands::{
    add_formation, ensure_hba, grant_json, reconcile, report_json, run, run_command, show_state,
};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_json, response_json, write_error, write_response};
