//! Reconciliation state machine
//!
//! ```text
//! Unregistered ──► Registering ──► RegisteredPendingSync ──► Synchronized
//!      │                                   ▲
//!      └──────────── (persisted state) ────┘
//!
//! any state ──► Failed(reason)   (absorbing)
//! ```
//!
//! Transitions consume the state and are explicit; anything not drawn above
//! is refused. The machine lives for one run: the durable part of a node's
//! progress is its persisted stage, not this value.

use std::fmt;

use super::errors::{EngineError, EngineResult};

/// Where one reconciliation run stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileState {
    /// Nothing done yet
    Unregistered,
    /// Registration call in flight
    Registering,
    /// Identity persisted, access rules not yet confirmed
    RegisteredPendingSync,
    /// Identity persisted and access rules granted
    Synchronized,
    /// The run stopped on an error
    Failed { reason: String },
}

impl Default for ReconcileState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileState {
    pub fn new() -> Self {
        Self::Unregistered
    }

    /// State name for logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Registering => "registering",
            Self::RegisteredPendingSync => "registered_pending_sync",
            Self::Synchronized => "synchronized",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_synchronized(&self) -> bool {
        matches!(self, Self::Synchronized)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Unregistered → Registering
    pub fn begin_registration(self) -> EngineResult<Self> {
        match self {
            Self::Unregistered => Ok(Self::Registering),
            _ => Err(EngineError::forbidden_transition(self.as_str(), "registering")),
        }
    }

    /// Registering → RegisteredPendingSync, once the identity is persisted.
    pub fn registration_persisted(self) -> EngineResult<Self> {
        match self {
            Self::Registering => Ok(Self::RegisteredPendingSync),
            _ => Err(EngineError::forbidden_transition(
                self.as_str(),
                "registered_pending_sync",
            )),
        }
    }

    /// Unregistered → RegisteredPendingSync, for a node with persisted state.
    pub fn resume(self) -> EngineResult<Self> {
        match self {
            Self::Unregistered => Ok(Self::RegisteredPendingSync),
            _ => Err(EngineError::forbidden_transition(
                self.as_str(),
                "registered_pending_sync",
            )),
        }
    }

    /// RegisteredPendingSync → Synchronized
    pub fn synchronize(self) -> EngineResult<Self> {
        match self {
            Self::RegisteredPendingSync => Ok(Self::Synchronized),
            _ => Err(EngineError::forbidden_transition(self.as_str(), "synchronized")),
        }
    }

    /// Any state → Failed. A failed state keeps its first reason.
    pub fn fail(self, reason: impl Into<String>) -> Self {
        match self {
            Self::Failed { .. } => self,
            _ => Self::Failed {
                reason: reason.into(),
            },
        }
    }
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}
