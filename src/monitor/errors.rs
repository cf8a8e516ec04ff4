//! Monitor call errors
//!
//! Timeouts and transport failures are retryable: an outer loop may simply
//! run reconciliation again. A rejection is the monitor's explicit answer
//! and needs an operator.

use thiserror::Error;

use crate::topology::TopologyError;

/// Result type for monitor calls
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Failures of a remote call to the monitor
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    /// No answer within the call timeout
    #[error("monitor {endpoint} did not answer {operation} within {timeout_ms} ms")]
    Timeout {
        endpoint: String,
        operation: &'static str,
        timeout_ms: u64,
    },

    /// The monitor refused the request
    #[error("monitor {endpoint} rejected {operation}: {reason}")]
    Rejected {
        endpoint: String,
        operation: &'static str,
        reason: String,
    },

    /// Connection failure or server-side error
    #[error("monitor {endpoint} unavailable during {operation}: {reason}")]
    Transport {
        endpoint: String,
        operation: &'static str,
        reason: String,
    },

    /// The answer could not be understood
    #[error("monitor {endpoint} sent an invalid {operation} response: {reason}")]
    Protocol {
        endpoint: String,
        operation: &'static str,
        reason: String,
    },

    /// The topology does not fit the bounded local model
    #[error("monitor {endpoint} sent an invalid topology: {source}")]
    InvalidTopology {
        endpoint: String,
        #[source]
        source: TopologyError,
    },
}

impl MonitorError {
    /// Whether re-running the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MonitorError::Timeout { .. } | MonitorError::Transport { .. }
        )
    }

    /// Endpoint the failed call was sent to.
    pub fn endpoint(&self) -> &str {
        match self {
            MonitorError::Timeout { endpoint, .. }
            | MonitorError::Rejected { endpoint, .. }
            | MonitorError::Transport { endpoint, .. }
            | MonitorError::Protocol { endpoint, .. }
            | MonitorError::InvalidTopology { endpoint, .. } => endpoint,
        }
    }
}
