//! Formations and their groups

use serde::{Deserialize, Serialize};

use super::errors::{TopologyError, TopologyResult};

/// Replication group identifier within a formation
pub type GroupId = i32;

/// Most formations one node can be registered into
pub const MAX_FORMATION_COUNT: usize = 12;

/// Most groups one formation may carry
pub const MAX_GROUP_COUNT: usize = 12;

/// Longest formation name, in bytes (a PostgreSQL identifier)
pub const MAX_FORMATION_NAME_LEN: usize = 63;

/// Check a formation name against the identifier rules the monitor uses.
pub fn validate_formation_name(name: &str) -> TopologyResult<()> {
    let invalid = |reason| TopologyError::InvalidFormationName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_FORMATION_NAME_LEN {
        return Err(invalid("name is longer than 63 bytes"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("name contains control characters"));
    }
    Ok(())
}

/// A named collection of replication groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formation {
    pub name: String,
    #[serde(default)]
    pub groups: Vec<GroupId>,
}

impl Formation {
    pub fn new(name: impl Into<String>, groups: Vec<GroupId>) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.groups.contains(&group)
    }

    /// Validate name, group bound and group uniqueness.
    pub fn validate(&self) -> TopologyResult<()> {
        validate_formation_name(&self.name)?;

        if self.groups.len() > MAX_GROUP_COUNT {
            return Err(TopologyError::TooManyGroups {
                formation: self.name.clone(),
                count: self.groups.len(),
                max: MAX_GROUP_COUNT,
            });
        }

        for (i, group) in self.groups.iter().enumerate() {
            if *group < 0 {
                return Err(TopologyError::InvalidGroup {
                    formation: self.name.clone(),
                    group: *group,
                });
            }
            if self.groups[..i].contains(group) {
                return Err(TopologyError::DuplicateGroup {
                    formation: self.name.clone(),
                    group: *group,
                });
            }
        }
        Ok(())
    }
}
