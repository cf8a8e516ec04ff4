//! Reconciliation errors
//!
//! The engine never retries on its own. `is_retryable` tells the caller
//! whether running reconciliation again later may succeed.

use thiserror::Error;

use crate::access::AccessError;
use crate::monitor::MonitorError;
use crate::state::{StateError, StateErrorKind};
use crate::topology::TopologyError;

/// Result type for reconciliation
pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of a reconciliation run
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),

    /// The state machine refused a move
    #[error("forbidden reconcile transition: {from} -> {to}")]
    Transition { from: &'static str, to: &'static str },

    /// The operation needs a registered node
    #[error("node \"{node_name}\" is not registered yet")]
    NotRegistered { node_name: String },
}

impl EngineError {
    pub fn forbidden_transition(from: &'static str, to: &'static str) -> Self {
        Self::Transition { from, to }
    }

    /// Whether running the same operation again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Monitor(e) => e.is_retryable(),
            EngineError::State(e) => e.is_retryable(),
            EngineError::Access(e) => e.is_retryable(),
            EngineError::Topology(_)
            | EngineError::Transition { .. }
            | EngineError::NotRegistered { .. } => false,
        }
    }

    /// Local identity and the monitor's disagree.
    pub fn is_identity_conflict(&self) -> bool {
        matches!(self, EngineError::State(e) if e.kind == StateErrorKind::IdentityConflict)
    }
}
