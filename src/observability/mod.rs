//! Observability subsystem for aerokeeper
//!
//! - Structured logging (JSON, one line per event)
//! - Typed lifecycle events
//! - Begin/complete scopes around reconciliation steps
//!
//! Observability is read-only: a failed log write never changes the outcome
//! of the operation being logged.
//!
//! # Usage
//!
//! ```ignore
//! use aerokeeper::observability::{Logger, Event, ObservationScope};
//!
//! Logger::info("HBA_RULE_ADDED", &[("path", "/var/lib/pgsql/data/pg_hba.conf")]);
//!
//! let scope = ObservationScope::new("RECONCILE");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event with fields
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

/// Log a lifecycle event at WARN level
pub fn warn_event(event: Event, fields: &[(&str, &str)]) {
    Logger::warn(event.as_str(), fields);
}

/// Log a lifecycle event at TRACE level
pub fn trace_event(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}
