//! Per-node settings carried through a reconciliation run

use std::path::{Path, PathBuf};

use crate::hba::{RuleTemplate, SKIP_AUTH_METHOD};
use crate::monitor::RegisterRequest;
use crate::state::StateStore;
use crate::topology::GroupId;

/// Identity and access settings of one node
///
/// Passed explicitly so several nodes can be reconciled in one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeContext {
    pub node_name: String,
    /// Hostname other nodes use to reach this one
    pub hostname: String,
    pub formation: String,
    pub group: GroupId,
    pub state_dir: PathBuf,
    pub ssl: bool,
    pub auth_method: String,
    /// Database the node's own user connects to
    pub dbname: String,
    pub username: String,
    pub replication_user: String,
    /// Set while the server is not running yet
    pub offline_data_dir: Option<PathBuf>,
}

impl NodeContext {
    /// Context with the default formation, group and roles.
    pub fn new(
        node_name: impl Into<String>,
        hostname: impl Into<String>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            node_name: node_name.into(),
            hostname: hostname.into(),
            formation: "default".to_string(),
            group: 0,
            state_dir: state_dir.into(),
            ssl: false,
            auth_method: "trust".to_string(),
            dbname: "postgres".to_string(),
            username: "aerokeeper".to_string(),
            replication_user: "aerokeeper_replicator".to_string(),
            offline_data_dir: None,
        }
    }

    pub fn with_assignment(mut self, formation: impl Into<String>, group: GroupId) -> Self {
        self.formation = formation.into();
        self.group = group;
        self
    }

    /// Compute rules but leave the HBA file alone.
    pub fn skip_hba(mut self) -> Self {
        self.auth_method = SKIP_AUTH_METHOD.to_string();
        self
    }

    /// Edit `<data_dir>/pg_hba.conf` directly and never reload.
    pub fn offline(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.offline_data_dir = Some(data_dir.into());
        self
    }

    pub fn offline_data_dir(&self) -> Option<&Path> {
        self.offline_data_dir.as_deref()
    }

    /// Grants this node needs: its database for its user, and replication
    /// for the replication user.
    pub fn rule_templates(&self) -> Vec<RuleTemplate> {
        vec![
            RuleTemplate::database_user(&self.dbname, &self.username),
            RuleTemplate::replication(&self.replication_user),
        ]
    }

    pub fn register_request(&self) -> RegisterRequest {
        RegisterRequest::new(self.node_name.clone(), self.formation.clone(), self.group)
    }

    pub fn state_store(&self) -> StateStore {
        StateStore::new(&self.state_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hba::{DatabaseSelector, UserSelector};

    #[test]
    fn test_rule_templates() {
        let context = NodeContext::new("node-a", "node-a.local", "/var/lib/aerokeeper");
        let templates = context.rule_templates();

        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].database, DatabaseSelector::Named("postgres".to_string()));
        assert_eq!(templates[0].user, UserSelector::Named("aerokeeper".to_string()));
        assert_eq!(templates[1].database, DatabaseSelector::Replication);
    }

    #[test]
    fn test_builders() {
        let context = NodeContext::new("node-a", "node-a.local", "/var/lib/aerokeeper")
            .with_assignment("sales", 2)
            .skip_hba()
            .offline("/data");

        assert_eq!(context.register_request(), RegisterRequest::new("node-a", "sales", 2));
        assert_eq!(context.auth_method, "skip");
        assert_eq!(context.offline_data_dir(), Some(Path::new("/data")));
    }
}
