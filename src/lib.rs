//! aerokeeper - node reconciliation engine
//!
//! Keeps a database node registered with its monitor, mirrors the monitor's
//! view of the node in a durable local state file, and opens the node's
//! local network in `pg_hba.conf`.

pub mod access;
pub mod cli;
pub mod engine;
pub mod hba;
pub mod monitor;
pub mod network;
pub mod observability;
pub mod state;
pub mod topology;
