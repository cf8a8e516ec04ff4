//! Node identity and its local mirror
//!
//! The monitor holds the authoritative identity of every node. `NodeState`
//! is this node's cached copy: stale until reconciled, updated in place when
//! the monitor's view moves, never recreated.

use serde::{Deserialize, Serialize};

use super::errors::{StateError, StateResult};
use crate::topology::{GroupId, TopologySnapshot};

/// Monitor-assigned node identifier
pub type NodeId = i64;

/// Identity of a node as the monitor reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub node_id: NodeId,
    pub node_name: String,
    pub formation: String,
    pub group: GroupId,
}

/// Last lifecycle stage the node durably reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStage {
    /// Never registered with the monitor
    Unregistered,
    /// Registered; access control not yet confirmed
    Registered,
    /// Registered and access control granted
    Synchronized,
}

impl NodeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStage::Unregistered => "unregistered",
            NodeStage::Registered => "registered",
            NodeStage::Synchronized => "synchronized",
        }
    }
}

/// Durable record of this node's identity and assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeState {
    /// Unset until the first successful registration
    pub node_id: Option<NodeId>,
    pub node_name: String,
    pub formation: String,
    pub group: GroupId,
    pub monitor_endpoint: String,
    pub stage: NodeStage,
    /// Formations (and groups) known to the monitor at the last reconcile
    #[serde(default)]
    pub formations: TopologySnapshot,
}

/// Result of [`reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub state: NodeState,
    /// Whether `state` differs from the input and must be persisted
    pub changed: bool,
}

impl NodeState {
    /// State of a node that has not registered yet.
    pub fn unregistered(
        node_name: impl Into<String>,
        formation: impl Into<String>,
        group: GroupId,
        monitor_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            node_id: None,
            node_name: node_name.into(),
            formation: formation.into(),
            group,
            monitor_endpoint: monitor_endpoint.into(),
            stage: NodeStage::Unregistered,
            formations: TopologySnapshot::empty(),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.node_id.is_some()
    }

    /// Replace the formation mirror with `snapshot`; true when it moved.
    pub fn adopt_topology(&mut self, snapshot: &TopologySnapshot) -> bool {
        if self.formations == *snapshot {
            return false;
        }
        self.formations = snapshot.clone();
        true
    }

    /// Record that access control has been granted; true when it moved.
    pub fn mark_synchronized(&mut self) -> bool {
        if self.stage == NodeStage::Synchronized {
            return false;
        }
        self.stage = NodeStage::Synchronized;
        true
    }
}

/// Bring `current` in line with the identity the monitor reports.
///
/// - No local id: adopt `fetched` wholesale (first registration).
/// - Same id: follow the monitor's formation and group if they moved.
/// - Different id, or a different node name: identity conflict, `current`
///   is left as it is.
pub fn reconcile(current: &NodeState, fetched: &NodeIdentity) -> StateResult<Reconciled> {
    if fetched.node_name != current.node_name {
        return Err(StateError::identity_conflict(format!(
            "monitor {} answered for node \"{}\" when asked about node \"{}\"",
            current.monitor_endpoint, fetched.node_name, current.node_name
        )));
    }

    let mut state = current.clone();

    match current.node_id {
        None => {
            state.node_id = Some(fetched.node_id);
            state.formation = fetched.formation.clone();
            state.group = fetched.group;
            if state.stage == NodeStage::Unregistered {
                state.stage = NodeStage::Registered;
            }
        }
        Some(node_id) if node_id != fetched.node_id => {
            return Err(StateError::identity_conflict(format!(
                "node \"{}\" is registered locally with id {} but monitor {} reports id {}",
                current.node_name, node_id, current.monitor_endpoint, fetched.node_id
            )));
        }
        Some(_) => {
            state.formation = fetched.formation.clone();
            state.group = fetched.group;
        }
    }

    let changed = state != *current;
    Ok(Reconciled { state, changed })
}
