//! CLI argument definitions using clap
//!
//! Commands:
//! - aerokeeper reconcile --config <path> [--skip-pg-hba] [--offline]
//! - aerokeeper ensure-hba --config <path> [--skip-pg-hba] [--offline]
//! - aerokeeper add-formation --config <path> --formation <name> [--group <id>]
//! - aerokeeper show-state --config <path>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::topology::GroupId;

/// aerokeeper - keeps a database node registered with its monitor and
/// reachable from its local network
#[derive(Parser, Debug)]
#[command(name = "aerokeeper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// How HBA edits are applied
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HbaArgs {
    /// Log the HBA rules instead of writing them
    #[arg(long)]
    pub skip_pg_hba: bool,

    /// Edit <pgdata>/pg_hba.conf directly; the server is not running
    #[arg(long)]
    pub offline: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register or reconcile with the monitor, then grant local network access
    Reconcile {
        /// Path to configuration file
        #[arg(long, default_value = "./aerokeeper.json")]
        config: PathBuf,

        #[command(flatten)]
        hba: HbaArgs,
    },

    /// Grant local network access without contacting the monitor
    EnsureHba {
        /// Path to configuration file
        #[arg(long, default_value = "./aerokeeper.json")]
        config: PathBuf,

        #[command(flatten)]
        hba: HbaArgs,
    },

    /// Register this node into one more formation
    AddFormation {
        /// Path to configuration file
        #[arg(long, default_value = "./aerokeeper.json")]
        config: PathBuf,

        /// Formation to join
        #[arg(long)]
        formation: String,

        /// Group within the formation
        #[arg(long, default_value_t = 0)]
        group: GroupId,
    },

    /// Print the persisted node state
    ShowState {
        /// Path to configuration file
        #[arg(long, default_value = "./aerokeeper.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
