//! Access synchronization errors
//!
//! A failed file edit and a failed reload are distinct: after a reload
//! failure the rule is on disk and the next successful reload applies it.

use thiserror::Error;

use crate::hba::HbaError;
use crate::network::NetworkError;

/// Result type for access synchronization
pub type AccessResult<T> = Result<T, AccessError>;

/// Failures to grant local network access
#[derive(Debug, Error)]
pub enum AccessError {
    /// The node's hostname does not map to a local address
    #[error("failed to find the local address of this node: {0}")]
    Address(#[from] NetworkError),

    /// The server could not say where its HBA file is
    #[error("failed to obtain the HBA file path from the database server: {reason}")]
    HbaPath { reason: String },

    /// Reading or rewriting the HBA file failed
    #[error(transparent)]
    Hba(#[from] HbaError),

    /// The rule is on disk but the server did not reload it
    #[error("failed to reload the database server configuration: {reason}")]
    Reload { reason: String },
}

impl AccessError {
    /// Only a reload failure can clear up on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::Reload { .. })
    }
}
