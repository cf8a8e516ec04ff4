//! Monitor client
//!
//! The monitor is the authority on node identity and cluster topology. This
//! node only ever asks it to register, to report an identity, or to report
//! the topology; every call is bounded in time and safe to repeat.

mod client;
mod errors;
mod http;
mod memory;

pub use client::{MonitorClient, RegisterRequest};
pub use errors::{MonitorError, MonitorResult};
pub use http::{HttpMonitorClient, DEFAULT_MONITOR_TIMEOUT};
pub use memory::{Fault, InMemoryMonitor};
