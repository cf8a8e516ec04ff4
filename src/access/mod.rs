//! Access synchronization
//!
//! Derives the HBA rules a node needs from its hostname and local network,
//! writes them into the database server's HBA file and reloads the server.

mod errors;
mod server;
mod synchronizer;

pub use errors::{AccessError, AccessResult};
pub use server::{offline_hba_file_path, DatabaseServer, PsqlServer, HBA_FILE_NAME};
pub use synchronizer::{AccessSynchronizer, GrantOutcome, LanAccessRequest};
