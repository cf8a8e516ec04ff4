//! Monitor call contract
//!
//! Every call is safe to repeat with the same arguments. In particular,
//! registering the same node name twice returns the same node id instead of
//! creating a second node.

use serde::{Deserialize, Serialize};

use super::errors::MonitorResult;
use crate::state::NodeIdentity;
use crate::topology::{GroupId, TopologySnapshot};

/// Registration of one node into one formation/group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub node_name: String,
    pub formation: String,
    pub group: GroupId,
}

impl RegisterRequest {
    pub fn new(node_name: impl Into<String>, formation: impl Into<String>, group: GroupId) -> Self {
        Self {
            node_name: node_name.into(),
            formation: formation.into(),
            group,
        }
    }
}

/// Remote calls this node makes to the monitor
pub trait MonitorClient {
    /// Where the monitor lives, for messages.
    fn endpoint(&self) -> &str;

    /// Register a node, or get back its existing registration.
    fn register(&self, request: &RegisterRequest) -> MonitorResult<NodeIdentity>;

    /// Identity the monitor holds for `node_name`, if any.
    fn fetch_identity(&self, node_name: &str) -> MonitorResult<Option<NodeIdentity>>;

    /// Formations and groups currently registered at the monitor.
    fn fetch_topology(&self) -> MonitorResult<TopologySnapshot>;
}

impl<T: MonitorClient + ?Sized> MonitorClient for &T {
    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }

    fn register(&self, request: &RegisterRequest) -> MonitorResult<NodeIdentity> {
        (**self).register(request)
    }

    fn fetch_identity(&self, node_name: &str) -> MonitorResult<Option<NodeIdentity>> {
        (**self).fetch_identity(node_name)
    }

    fn fetch_topology(&self) -> MonitorResult<TopologySnapshot> {
        (**self).fetch_topology()
    }
}
