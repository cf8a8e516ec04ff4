//! Bounded topology snapshots
//!
//! The monitor protocol carries formations and groups in fixed-capacity
//! structures. A snapshot therefore only exists in validated form: decoding
//! an oversized or duplicated document fails instead of truncating it.

use serde::{Deserialize, Serialize};

use super::errors::{TopologyError, TopologyResult};
use super::formation::{validate_formation_name, Formation, GroupId, MAX_FORMATION_COUNT, MAX_GROUP_COUNT};

/// Unvalidated wire/disk form of a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawTopologySnapshot {
    #[serde(default)]
    formations: Vec<Formation>,
}

/// Ordered set of formations (and their groups) at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTopologySnapshot", into = "RawTopologySnapshot")]
pub struct TopologySnapshot {
    formations: Vec<Formation>,
}

impl TryFrom<RawTopologySnapshot> for TopologySnapshot {
    type Error = TopologyError;

    fn try_from(raw: RawTopologySnapshot) -> TopologyResult<Self> {
        Self::new(raw.formations)
    }
}

impl From<TopologySnapshot> for RawTopologySnapshot {
    fn from(snapshot: TopologySnapshot) -> Self {
        Self {
            formations: snapshot.formations,
        }
    }
}

impl TopologySnapshot {
    /// Build a snapshot, rejecting anything [`validate`] rejects.
    pub fn new(formations: Vec<Formation>) -> TopologyResult<Self> {
        validate(&formations)?;
        Ok(Self { formations })
    }

    /// An empty snapshot
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a JSON topology document (`{"formations": [...]}`).
    pub fn decode(json: &str) -> TopologyResult<Self> {
        let raw: RawTopologySnapshot =
            serde_json::from_str(json).map_err(|e| TopologyError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn formations(&self) -> &[Formation] {
        &self.formations
    }

    pub fn formation(&self, name: &str) -> Option<&Formation> {
        self.formations.iter().find(|f| f.name == name)
    }

    /// Groups of `formation`, empty when it is unknown.
    pub fn groups(&self, formation: &str) -> &[GroupId] {
        self.formation(formation)
            .map(|f| f.groups.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, formation: &str, group: GroupId) -> bool {
        self.formation(formation)
            .map(|f| f.contains(group))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.formations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }

    /// Record `group` of `formation`, creating the formation if needed.
    ///
    /// Returns `false` when it was already recorded. Exceeding either bound
    /// is an error and leaves the snapshot unchanged.
    pub fn add_registration(&mut self, formation: &str, group: GroupId) -> TopologyResult<bool> {
        validate_formation_name(formation)?;
        if group < 0 {
            return Err(TopologyError::InvalidGroup {
                formation: formation.to_string(),
                group,
            });
        }

        match self.formations.iter_mut().find(|f| f.name == formation) {
            Some(existing) => {
                if existing.contains(group) {
                    return Ok(false);
                }
                if existing.groups.len() >= MAX_GROUP_COUNT {
                    return Err(TopologyError::TooManyGroups {
                        formation: formation.to_string(),
                        count: existing.groups.len() + 1,
                        max: MAX_GROUP_COUNT,
                    });
                }
                existing.groups.push(group);
            }
            None => {
                if self.formations.len() >= MAX_FORMATION_COUNT {
                    return Err(TopologyError::TooManyFormations {
                        count: self.formations.len() + 1,
                        max: MAX_FORMATION_COUNT,
                    });
                }
                self.formations.push(Formation::new(formation, vec![group]));
            }
        }
        Ok(true)
    }
}

/// Reject formation lists the bounded model cannot hold.
///
/// Checks the formation count, then each formation (name, group count,
/// duplicate or negative groups), then duplicate formation names.
pub fn validate(formations: &[Formation]) -> TopologyResult<()> {
    if formations.len() > MAX_FORMATION_COUNT {
        return Err(TopologyError::TooManyFormations {
            count: formations.len(),
            max: MAX_FORMATION_COUNT,
        });
    }

    for (i, formation) in formations.iter().enumerate() {
        formation.validate()?;
        if formations[..i].iter().any(|f| f.name == formation.name) {
            return Err(TopologyError::DuplicateFormation(formation.name.clone()));
        }
    }
    Ok(())
}
