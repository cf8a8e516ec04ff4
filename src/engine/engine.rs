//! Reconciliation engine
//!
//! One run brings a node from whatever it last persisted to synchronized:
//!
//! - no persisted state: register, fetch topology, persist, grant access
//! - persisted state: fetch identity and topology (no registration call),
//!   reconcile, persist on change, grant access
//!
//! Each stage is idempotent and the state is persisted before access is
//! granted, so a run interrupted anywhere is completed by the next one
//! without registering twice.

use super::context::NodeContext;
use super::errors::{EngineError, EngineResult};
use super::state::ReconcileState;
use crate::access::{AccessSynchronizer, DatabaseServer, GrantOutcome, LanAccessRequest};
use crate::monitor::{MonitorClient, MonitorError, RegisterRequest};
use crate::network::NetworkLocator;
use crate::observability::{log_event, warn_event, Event, Logger, ObservationScope};
use crate::state::{
    reconcile, NodeId, NodeIdentity, NodeState, Reconciled, StateError, StateStore,
};
use crate::topology::{validate_formation_name, GroupId};

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub state: ReconcileState,
    /// Node state as persisted at the end of the run
    pub node: NodeState,
    /// A registration call was made during this run
    pub registered_now: bool,
    /// The persisted state was written during this run
    pub state_changed: bool,
    pub grants: Vec<GrantOutcome>,
    /// Grants that did not happen, for the operator
    pub warnings: Vec<String>,
}

impl ReconcileReport {
    pub fn node_id(&self) -> Option<NodeId> {
        self.node.node_id
    }

    /// Synchronized, but some rules have to be applied by hand.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Outcome of registering into an additional formation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormationAdded {
    pub node_id: NodeId,
    pub formation: String,
    pub group: GroupId,
    /// False when the node was already registered there
    pub added: bool,
}

/// Drives a node through registration, state persistence and access sync
pub struct ReconciliationEngine<M, L, S>
where
    M: MonitorClient,
    L: NetworkLocator,
    S: DatabaseServer,
{
    context: NodeContext,
    monitor: M,
    access: AccessSynchronizer<L>,
    server: S,
    store: StateStore,
    machine: ReconcileState,
}

impl<M, L, S> ReconciliationEngine<M, L, S>
where
    M: MonitorClient,
    L: NetworkLocator,
    S: DatabaseServer,
{
    pub fn new(context: NodeContext, monitor: M, locator: L, server: S) -> Self {
        let store = context.state_store();
        Self {
            context,
            monitor,
            access: AccessSynchronizer::new(locator),
            server,
            store,
            machine: ReconcileState::new(),
        }
    }

    pub fn context(&self) -> &NodeContext {
        &self.context
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    /// State of the current (or last) run.
    pub fn state(&self) -> &ReconcileState {
        &self.machine
    }

    /// Persisted node state, if any.
    pub fn load_state(&self) -> EngineResult<Option<NodeState>> {
        Ok(self.store.load()?)
    }

    /// Reconcile this node with the monitor and grant its access rules.
    ///
    /// Every run starts from `Unregistered`; a failure leaves the machine in
    /// `Failed` until the next run.
    pub fn run(&mut self) -> EngineResult<ReconcileReport> {
        self.machine = ReconcileState::new();
        let scope = ObservationScope::with_fields(
            "RECONCILE",
            &[
                ("monitor", self.monitor.endpoint()),
                ("node_name", &self.context.node_name),
            ],
        );

        match self.reconcile_and_sync() {
            Ok(report) => {
                let node_id = report
                    .node_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                let warnings = report.warnings.len().to_string();
                scope.complete_with_fields(&[
                    ("node_id", &node_id),
                    ("state", report.state.as_str()),
                    ("warnings", &warnings),
                ]);
                Ok(report)
            }
            Err(e) => {
                let reason = e.to_string();
                if e.is_identity_conflict() {
                    log_event(
                        Event::StateIdentityConflict,
                        &[
                            ("node_name", &self.context.node_name),
                            ("reason", &reason),
                            ("state_file", &self.store.path().display().to_string()),
                        ],
                    );
                }
                self.machine = std::mem::take(&mut self.machine).fail(reason.clone());
                scope.fail(&reason, e.is_retryable());
                Err(e)
            }
        }
    }

    /// Register this node into one more formation.
    ///
    /// The monitor must answer with the node id already persisted; the
    /// formation is then recorded locally, within the topology bounds.
    pub fn add_formation(&mut self, formation: &str, group: GroupId) -> EngineResult<FormationAdded> {
        validate_formation_name(formation)?;
        let group_str = group.to_string();
        let scope = ObservationScope::with_fields(
            "ADD_FORMATION",
            &[
                ("formation", formation),
                ("group", &group_str),
                ("node_name", &self.context.node_name),
            ],
        );

        match self.register_additional(formation, group) {
            Ok(added) => {
                scope.complete_with_fields(&[("added", if added.added { "true" } else { "false" })]);
                Ok(added)
            }
            Err(e) => {
                scope.fail(&e.to_string(), e.is_retryable());
                Err(e)
            }
        }
    }

    fn reconcile_and_sync(&mut self) -> EngineResult<ReconcileReport> {
        let persisted = self.store.load()?.filter(NodeState::is_registered);

        let (mut node, registered_now, mut state_changed) = match persisted {
            None => {
                self.advance(ReconcileState::begin_registration)?;
                let node = self.register()?;
                self.advance(ReconcileState::registration_persisted)?;
                (node, true, true)
            }
            Some(persisted) => {
                self.advance(ReconcileState::resume)?;
                let Reconciled { state, changed } = self.refresh(&persisted)?;
                (state, false, changed)
            }
        };

        let mut grants = Vec::new();
        let mut warnings = Vec::new();
        for template in self.context.rule_templates() {
            let request = LanAccessRequest {
                ssl: self.context.ssl,
                template: &template,
                hostname: &self.context.hostname,
                auth_method: &self.context.auth_method,
                offline_data_dir: self.context.offline_data_dir(),
            };
            let outcome = self.access.grant_local_network_access(&self.server, &request)?;
            if let Some(warning) = outcome.warning() {
                warnings.push(warning);
            }
            grants.push(outcome);
        }

        if node.mark_synchronized() {
            self.store.store(&node)?;
            state_changed = true;
        }
        self.advance(ReconcileState::synchronize)?;

        log_event(
            Event::ReconcileSynchronized,
            &[
                ("formation", &node.formation),
                ("group", &node.group.to_string()),
                ("node_name", &node.node_name),
            ],
        );

        Ok(ReconcileReport {
            state: self.machine.clone(),
            node,
            registered_now,
            state_changed,
            grants,
            warnings,
        })
    }

    /// First registration: register, fetch topology, persist.
    fn register(&self) -> EngineResult<NodeState> {
        let request = self.context.register_request();
        let identity = self.call_register(&request)?;
        let topology = self
            .monitor
            .fetch_topology()
            .inspect_err(|e| self.monitor_failed(e))?;

        let fresh = NodeState::unregistered(
            self.context.node_name.clone(),
            self.context.formation.clone(),
            self.context.group,
            self.monitor.endpoint(),
        );
        let mut node = reconcile(&fresh, &identity)?.state;
        node.adopt_topology(&topology);

        self.store.store(&node)?;
        Ok(node)
    }

    /// Known node: compare with the monitor and follow it, persisting only
    /// when something moved.
    fn refresh(&self, persisted: &NodeState) -> EngineResult<Reconciled> {
        if persisted.node_name != self.context.node_name {
            return Err(StateError::identity_conflict(format!(
                "state file {} belongs to node \"{}\", not \"{}\"",
                self.store.path().display(),
                persisted.node_name,
                self.context.node_name
            ))
            .into());
        }

        let identity = self
            .monitor
            .fetch_identity(&persisted.node_name)
            .inspect_err(|e| self.monitor_failed(e))?
            .ok_or_else(|| {
                StateError::identity_conflict(format!(
                    "node \"{}\" is registered locally with id {} but monitor {} does not know it",
                    persisted.node_name,
                    persisted
                        .node_id
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    self.monitor.endpoint()
                ))
            })?;
        let topology = self
            .monitor
            .fetch_topology()
            .inspect_err(|e| self.monitor_failed(e))?;

        let Reconciled { mut state, mut changed } = reconcile(persisted, &identity)?;
        changed |= state.adopt_topology(&topology);

        if changed {
            self.store.store(&state)?;
        } else {
            Logger::trace(
                "STATE_UNCHANGED",
                &[("node_name", &state.node_name), ("stage", state.stage.as_str())],
            );
        }
        Ok(Reconciled { state, changed })
    }

    fn register_additional(&self, formation: &str, group: GroupId) -> EngineResult<FormationAdded> {
        let mut node = self
            .store
            .load()?
            .filter(NodeState::is_registered)
            .ok_or_else(|| EngineError::NotRegistered {
                node_name: self.context.node_name.clone(),
            })?;

        // bounds are checked before the monitor hears about it
        let mut formations = node.formations.clone();
        formations.add_registration(formation, group)?;

        let request = RegisterRequest::new(node.node_name.clone(), formation, group);
        let identity = self.call_register(&request)?;

        if node.node_id != Some(identity.node_id) {
            return Err(StateError::identity_conflict(format!(
                "node \"{}\" is registered locally with id {} but monitor {} registered it into \"{}\" as id {}",
                node.node_name,
                node.node_id.map(|id| id.to_string()).unwrap_or_default(),
                self.monitor.endpoint(),
                formation,
                identity.node_id
            ))
            .into());
        }

        let added = node.adopt_topology(&formations);
        if added {
            self.store.store(&node)?;
        }

        Ok(FormationAdded {
            node_id: identity.node_id,
            formation: formation.to_string(),
            group,
            added,
        })
    }

    fn call_register(&self, request: &RegisterRequest) -> EngineResult<NodeIdentity> {
        let group = request.group.to_string();
        log_event(
            Event::MonitorRegister,
            &[
                ("formation", &request.formation),
                ("group", &group),
                ("monitor", self.monitor.endpoint()),
                ("node_name", &request.node_name),
            ],
        );

        let identity = self
            .monitor
            .register(request)
            .inspect_err(|e| self.monitor_failed(e))?;

        log_event(
            Event::MonitorRegistered,
            &[
                ("formation", &identity.formation),
                ("group", &identity.group.to_string()),
                ("node_id", &identity.node_id.to_string()),
                ("node_name", &identity.node_name),
            ],
        );
        Ok(identity)
    }

    fn monitor_failed(&self, e: &MonitorError) {
        let reason = e.to_string();
        let fields = [("monitor", self.monitor.endpoint()), ("reason", reason.as_str())];
        if e.is_retryable() {
            warn_event(Event::MonitorUnavailable, &fields);
        } else {
            Logger::error(Event::MonitorRejected.as_str(), &fields);
        }
    }

    fn advance(
        &mut self,
        step: fn(ReconcileState) -> EngineResult<ReconcileState>,
    ) -> EngineResult<()> {
        let from = std::mem::take(&mut self.machine);
        let from_name = from.as_str();
        self.machine = step(from)?;

        log_event(
            Event::ReconcileTransition,
            &[
                ("from", from_name),
                ("node_name", &self.context.node_name),
                ("to", self.machine.as_str()),
            ],
        );
        Ok(())
    }
}
