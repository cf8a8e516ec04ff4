//! Topology validation errors

use thiserror::Error;

use super::formation::GroupId;

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

/// A snapshot or formation that does not fit the bounded local model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("too many formations: {count} (max {max})")]
    TooManyFormations { count: usize, max: usize },

    #[error("formation \"{formation}\" has too many groups: {count} (max {max})")]
    TooManyGroups {
        formation: String,
        count: usize,
        max: usize,
    },

    #[error("duplicate formation \"{0}\"")]
    DuplicateFormation(String),

    #[error("duplicate group {group} in formation \"{formation}\"")]
    DuplicateGroup { formation: String, group: GroupId },

    #[error("invalid formation name \"{name}\": {reason}")]
    InvalidFormationName { name: String, reason: &'static str },

    #[error("invalid group {group} in formation \"{formation}\": group ids are non-negative")]
    InvalidGroup { formation: String, group: GroupId },

    /// The payload is not a topology document at all
    #[error("malformed topology document: {0}")]
    Malformed(String),
}
