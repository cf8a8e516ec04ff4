//! HBA file error types
//!
//! Read and write failures are kept apart: a read failure means the current
//! contents are unknown, a write failure means the new contents were computed
//! but could not be persisted. Both are fatal and carry the file path.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for HBA file operations
pub type HbaResult<T> = Result<T, HbaError>;

/// Errors raised while editing an HBA file
#[derive(Debug, Error)]
pub enum HbaError {
    /// The file could not be read
    #[error("failed to read HBA file \"{}\": {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The new contents could not be written
    #[error("failed to write HBA file \"{}\": {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HbaError {
    /// Path of the file involved.
    pub fn path(&self) -> &PathBuf {
        match self {
            HbaError::Read { path, .. } | HbaError::Write { path, .. } => path,
        }
    }

    /// True when the failure happened before the file state was known.
    pub fn is_read(&self) -> bool {
        matches!(self, HbaError::Read { .. })
    }
}
