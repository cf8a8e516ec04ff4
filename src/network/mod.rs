//! Local network discovery
//!
//! Resolves the hostname a node registers under to the local IP address and
//! the local network (CIDR) that address belongs to.

mod address;
mod errors;
mod locator;

pub use address::{find_local_address, find_local_cidr, ip_address_type, InterfaceAddress, IpAddressType};
pub use errors::{NetworkError, NetworkResult};
pub use locator::{NetworkLocator, StaticNetworkLocator, SystemNetworkLocator};
