//! Reconciliation engine
//!
//! Brings one node in line with the monitor: registration on first run,
//! identity and topology reconciliation afterwards, then access rules for
//! the node's local network.

mod context;
#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod state;

pub use context::NodeContext;
pub use engine::{FormationAdded, ReconcileReport, ReconciliationEngine};
pub use errors::{EngineError, EngineResult};
pub use state::ReconcileState;
