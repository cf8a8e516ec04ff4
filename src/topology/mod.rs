//! Topology model
//!
//! The formations, and groups within them, a node is or becomes registered
//! into. Pure data and validation, no I/O.
//!
//! Bounds:
//! - at most 12 formations per snapshot
//! - at most 12 groups per formation
//! - formation names are 1..=63 bytes and unique within a snapshot
//! - group ids are non-negative and unique within a formation

mod errors;
mod formation;
mod snapshot;

pub use errors::{TopologyError, TopologyResult};
pub use formation::{
    validate_formation_name, Formation, GroupId, MAX_FORMATION_COUNT, MAX_FORMATION_NAME_LEN,
    MAX_GROUP_COUNT,
};
pub use snapshot::{validate, TopologySnapshot};
