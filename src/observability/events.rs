//! Observability events for aerokeeper
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in aerokeeper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Monitor
    /// Registration call sent to the monitor
    MonitorRegister,
    /// Monitor accepted (or re-confirmed) the registration
    MonitorRegistered,
    /// Monitor call timed out or failed in transport
    MonitorUnavailable,
    /// Monitor explicitly refused a request
    MonitorRejected,

    // Node state
    /// Node state read from disk
    StateLoaded,
    /// Node state written to disk
    StateStored,
    /// Persisted identity disagrees with the monitor (FATAL)
    StateIdentityConflict,

    // Access control
    /// Local address and CIDR resolved for a hostname
    HbaNetworkResolved,
    /// A rule was appended to the HBA file
    HbaRuleAdded,
    /// The rule was already present
    HbaRulePresent,
    /// HBA edit skipped (skip sentinel or unknown network)
    HbaEditSkipped,
    /// Server configuration reloaded
    ServerReloaded,

    // Reconciliation
    /// Reconciliation state machine moved
    ReconcileTransition,
    /// Node synchronized with the monitor's view
    ReconcileSynchronized,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::MonitorRegister => "MONITOR_REGISTER_BEGIN",
            Event::MonitorRegistered => "MONITOR_REGISTER_COMPLETE",
            Event::MonitorUnavailable => "MONITOR_UNAVAILABLE",
            Event::MonitorRejected => "MONITOR_REJECTED",

            Event::StateLoaded => "STATE_LOADED",
            Event::StateStored => "STATE_STORED",
            Event::StateIdentityConflict => "STATE_IDENTITY_CONFLICT",

            Event::HbaNetworkResolved => "HBA_NETWORK_RESOLVED",
            Event::HbaRuleAdded => "HBA_RULE_ADDED",
            Event::HbaRulePresent => "HBA_RULE_PRESENT",
            Event::HbaEditSkipped => "HBA_EDIT_SKIPPED",
            Event::ServerReloaded => "SERVER_RELOADED",

            Event::ReconcileTransition => "RECONCILE_TRANSITION",
            Event::ReconcileSynchronized => "RECONCILE_SYNCHRONIZED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::StateIdentityConflict)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::MonitorRegister,
            Event::MonitorRegistered,
            Event::MonitorUnavailable,
            Event::MonitorRejected,
            Event::StateLoaded,
            Event::StateStored,
            Event::StateIdentityConflict,
            Event::HbaNetworkResolved,
            Event::HbaRuleAdded,
            Event::HbaRulePresent,
            Event::HbaEditSkipped,
            Event::ServerReloaded,
            Event::ReconcileTransition,
            Event::ReconcileSynchronized,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
            // `_FAILED` names belong to ObservationScope
            assert!(!s.ends_with("_FAILED"));
        }
    }

    #[test]
    fn test_fatal_events() {
        assert!(Event::StateIdentityConflict.is_fatal());
        assert!(!Event::HbaEditSkipped.is_fatal());
    }
}
