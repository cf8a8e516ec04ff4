//! Node state error types
//!
//! An identity conflict means this node believes it is a different entity
//! than the monitor reports. It is never resolved automatically: adopting the
//! new identity would orphan everything tied to the old one.

use std::fmt;

/// Node state error type
#[derive(Debug, Clone)]
pub struct StateError {
    /// Error kind
    pub kind: StateErrorKind,
    /// Error message
    pub message: String,
}

/// Node state error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateErrorKind {
    /// State file could not be read or written
    Io,

    /// State file exists but fails its checksum or format check
    Corrupt,

    /// State could not be encoded or decoded
    Serialization,

    /// The exclusive state lock could not be taken
    Lock,

    /// Persisted identity conflicts with the monitor's identity
    IdentityConflict,
}

impl StateError {
    /// Create a new state error.
    pub fn new(kind: StateErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StateErrorKind::Io, message)
    }

    /// Create a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(StateErrorKind::Corrupt, message)
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(StateErrorKind::Serialization, message)
    }

    /// Create a lock error.
    pub fn lock(message: impl Into<String>) -> Self {
        Self::new(StateErrorKind::Lock, message)
    }

    /// Create an identity conflict error.
    pub fn identity_conflict(message: impl Into<String>) -> Self {
        Self::new(StateErrorKind::IdentityConflict, message)
    }

    /// Check if re-running the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, StateErrorKind::Lock)
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateError({:?}): {}", self.kind, self.message)
    }
}

impl std::error::Error for StateError {}

/// Result type for node state operations
pub type StateResult<T> = Result<T, StateError>;
