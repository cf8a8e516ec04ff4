//! In-process monitor
//!
//! Keeps registrations in memory and follows the same rules as the real
//! monitor: one id per node name, one group per (node, formation), and the
//! topology is whatever the registrations add up to. Faults can be queued to
//! exercise timeout and rejection handling.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::client::{MonitorClient, RegisterRequest};
use super::errors::{MonitorError, MonitorResult};
use crate::state::{NodeId, NodeIdentity};
use crate::topology::{Formation, GroupId, TopologySnapshot};

/// Failure to inject into the next monitor call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Transport,
    Rejected,
}

#[derive(Debug)]
struct NodeRecord {
    node_id: NodeId,
    node_name: String,
    /// (formation, group) in registration order; the first one is primary
    registrations: Vec<(String, GroupId)>,
}

impl NodeRecord {
    fn identity(&self) -> NodeIdentity {
        let (formation, group) = self.registrations[0].clone();
        NodeIdentity {
            node_id: self.node_id,
            node_name: self.node_name.clone(),
            formation,
            group,
        }
    }
}

#[derive(Debug, Default)]
struct MonitorTables {
    next_node_id: NodeId,
    nodes: Vec<NodeRecord>,
    faults: VecDeque<Fault>,
    register_calls: usize,
    /// Replaces the derived topology when set
    topology_override: Option<Vec<Formation>>,
}

/// Monitor living in the current process
#[derive(Debug)]
pub struct InMemoryMonitor {
    endpoint: String,
    tables: Mutex<MonitorTables>,
}

impl Default for InMemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMonitor {
    pub fn new() -> Self {
        Self {
            endpoint: "memory://monitor".to_string(),
            tables: Mutex::new(MonitorTables {
                next_node_id: 1,
                ..MonitorTables::default()
            }),
        }
    }

    /// Make the next call fail with `fault`. Faults queue up in order.
    pub fn fail_next(&self, fault: Fault) {
        self.tables().faults.push_back(fault);
    }

    /// Number of `register` calls that reached the registration logic.
    pub fn register_calls(&self) -> usize {
        self.tables().register_calls
    }

    /// Number of distinct registered nodes.
    pub fn node_count(&self) -> usize {
        self.tables().nodes.len()
    }

    /// Move a node's primary registration, as an operator would.
    pub fn reassign(&self, node_name: &str, formation: &str, group: GroupId) -> bool {
        let mut tables = self.tables();
        match tables.nodes.iter_mut().find(|n| n.node_name == node_name) {
            Some(node) => {
                node.registrations[0] = (formation.to_string(), group);
                true
            }
            None => false,
        }
    }

    /// Drop a node and register it afresh under a new id.
    pub fn recreate(&self, node_name: &str) -> Option<NodeId> {
        let mut tables = self.tables();
        let node_id = tables.next_node_id;
        let node = tables.nodes.iter_mut().find(|n| n.node_name == node_name)?;
        node.node_id = node_id;
        tables.next_node_id += 1;
        Some(node_id)
    }

    /// Serve `formations` verbatim from `fetch_topology`, unvalidated.
    pub fn override_topology(&self, formations: Vec<Formation>) {
        self.tables().topology_override = Some(formations);
    }

    fn tables(&self) -> MutexGuard<'_, MonitorTables> {
        // a panicking test thread must not wedge the others
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_fault(&self, tables: &mut MonitorTables, operation: &'static str) -> MonitorResult<()> {
        let fault = match tables.faults.pop_front() {
            Some(fault) => fault,
            None => return Ok(()),
        };
        let endpoint = self.endpoint.clone();
        Err(match fault {
            Fault::Timeout => MonitorError::Timeout {
                endpoint,
                operation,
                timeout_ms: 0,
            },
            Fault::Transport => MonitorError::Transport {
                endpoint,
                operation,
                reason: "injected transport failure".to_string(),
            },
            Fault::Rejected => MonitorError::Rejected {
                endpoint,
                operation,
                reason: "injected rejection".to_string(),
            },
        })
    }

    fn rejected(&self, reason: String) -> MonitorError {
        MonitorError::Rejected {
            endpoint: self.endpoint.clone(),
            operation: "register",
            reason,
        }
    }
}

impl MonitorClient for InMemoryMonitor {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn register(&self, request: &RegisterRequest) -> MonitorResult<NodeIdentity> {
        let mut tables = self.tables();
        self.take_fault(&mut tables, "register")?;
        tables.register_calls += 1;

        let mut topology = derive_topology(&tables.nodes);
        let existing = tables
            .nodes
            .iter()
            .position(|n| n.node_name == request.node_name);

        if let Some(i) = existing {
            let node = &tables.nodes[i];
            if let Some((_, group)) = node
                .registrations
                .iter()
                .find(|(formation, _)| *formation == request.formation)
            {
                if *group != request.group {
                    return Err(self.rejected(format!(
                        "node \"{}\" is already registered in formation \"{}\" group {}",
                        request.node_name, request.formation, group
                    )));
                }
                return Ok(NodeIdentity {
                    node_id: node.node_id,
                    node_name: node.node_name.clone(),
                    formation: request.formation.clone(),
                    group: request.group,
                });
            }
        }

        topology
            .add_registration(&request.formation, request.group)
            .map_err(|e| self.rejected(e.to_string()))?;

        let registration = (request.formation.clone(), request.group);
        let node_id = match existing {
            Some(i) => {
                tables.nodes[i].registrations.push(registration);
                tables.nodes[i].node_id
            }
            None => {
                let node_id = tables.next_node_id;
                tables.next_node_id += 1;
                tables.nodes.push(NodeRecord {
                    node_id,
                    node_name: request.node_name.clone(),
                    registrations: vec![registration],
                });
                node_id
            }
        };

        Ok(NodeIdentity {
            node_id,
            node_name: request.node_name.clone(),
            formation: request.formation.clone(),
            group: request.group,
        })
    }

    fn fetch_identity(&self, node_name: &str) -> MonitorResult<Option<NodeIdentity>> {
        let mut tables = self.tables();
        self.take_fault(&mut tables, "fetch_identity")?;

        Ok(tables
            .nodes
            .iter()
            .find(|n| n.node_name == node_name)
            .map(NodeRecord::identity))
    }

    fn fetch_topology(&self) -> MonitorResult<TopologySnapshot> {
        let mut tables = self.tables();
        self.take_fault(&mut tables, "fetch_topology")?;

        match &tables.topology_override {
            Some(formations) => TopologySnapshot::new(formations.clone()).map_err(|source| {
                MonitorError::InvalidTopology {
                    endpoint: self.endpoint.clone(),
                    source,
                }
            }),
            None => Ok(derive_topology(&tables.nodes)),
        }
    }
}

/// Topology implied by the registrations, in registration order.
fn derive_topology(nodes: &[NodeRecord]) -> TopologySnapshot {
    let mut formations: Vec<Formation> = Vec::new();
    for (formation, group) in nodes.iter().flat_map(|n| n.registrations.iter()) {
        match formations.iter_mut().find(|f| f.name == *formation) {
            Some(existing) if existing.contains(*group) => {}
            Some(existing) => existing.groups.push(*group),
            None => formations.push(Formation::new(formation.clone(), vec![*group])),
        }
    }
    // registrations only ever go through add_registration, so this holds
    TopologySnapshot::new(formations).unwrap_or_default()
}
