//! CLI-specific error types
//!
//! Every failure surfaces as one code plus a retryable flag, so a
//! supervisor can tell "run me again later" from "page someone".

use std::fmt;
use std::io;

use crate::access::AccessError;
use crate::engine::EngineError;
use crate::monitor::MonitorError;
use crate::state::StateError;

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// Monitor timed out or could not be reached
    MonitorUnavailable,
    /// Monitor refused the request
    MonitorRejected,
    /// Topology outside the supported bounds
    InvalidTopology,
    /// Local identity disagrees with the monitor
    IdentityConflict,
    /// State file unreadable, corrupt or locked
    StateError,
    /// HBA edit, address resolution or reload failed
    AccessError,
    /// Node has not registered yet
    NotRegistered,
    /// Reconciliation state machine refused a move
    ReconcileFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AEROKEEPER_CONFIG_ERROR",
            Self::IoError => "AEROKEEPER_IO_ERROR",
            Self::MonitorUnavailable => "AEROKEEPER_MONITOR_UNAVAILABLE",
            Self::MonitorRejected => "AEROKEEPER_MONITOR_REJECTED",
            Self::InvalidTopology => "AEROKEEPER_INVALID_TOPOLOGY",
            Self::IdentityConflict => "AEROKEEPER_IDENTITY_CONFLICT",
            Self::StateError => "AEROKEEPER_STATE_ERROR",
            Self::AccessError => "AEROKEEPER_ACCESS_ERROR",
            Self::NotRegistered => "AEROKEEPER_NOT_REGISTERED",
            Self::ReconcileFailed => "AEROKEEPER_RECONCILE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
    retryable: bool,
}

impl CliError {
    /// Create a new, non-retryable CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether running the command again later may succeed
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        let code = match &e {
            EngineError::Monitor(MonitorError::InvalidTopology { .. }) => CliErrorCode::InvalidTopology,
            EngineError::Monitor(m) if m.is_retryable() => CliErrorCode::MonitorUnavailable,
            EngineError::Monitor(_) => CliErrorCode::MonitorRejected,
            EngineError::State(_) if e.is_identity_conflict() => CliErrorCode::IdentityConflict,
            EngineError::State(_) => CliErrorCode::StateError,
            EngineError::Access(_) => CliErrorCode::AccessError,
            EngineError::Topology(_) => CliErrorCode::InvalidTopology,
            EngineError::Transition { .. } => CliErrorCode::ReconcileFailed,
            EngineError::NotRegistered { .. } => CliErrorCode::NotRegistered,
        };
        Self::new(code, e.to_string()).with_retryable(e.is_retryable())
    }
}

impl From<AccessError> for CliError {
    fn from(e: AccessError) -> Self {
        EngineError::from(e).into()
    }
}

impl From<StateError> for CliError {
    fn from(e: StateError) -> Self {
        EngineError::from(e).into()
    }
}

impl From<MonitorError> for CliError {
    fn from(e: MonitorError) -> Self {
        EngineError::from(e).into()
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
