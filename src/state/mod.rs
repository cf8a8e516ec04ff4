//! Node state
//!
//! Durable local record of the identity the monitor assigned to this node
//! (node id, formation, group) and the last lifecycle stage it reached.
//!
//! - Created empty at first run, populated by registration
//! - Reloaded on every invocation and reconciled against the monitor
//! - Written only when it changes, never deleted here

mod checksum;
mod errors;
mod node_state;
mod store;

pub use errors::{StateError, StateErrorKind, StateResult};
pub use node_state::{reconcile, NodeId, NodeIdentity, NodeStage, NodeState, Reconciled};
pub use store::{StateStore, STATE_FILE_NAME, STATE_FORMAT_VERSION};
