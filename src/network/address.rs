//! Address classification and local-interface matching
//!
//! Pure functions over a snapshot of the host's interfaces, shared by every
//! [`NetworkLocator`](super::NetworkLocator) implementation.

use std::net::IpAddr;

use ipnet::IpNet;

/// Kind of IP literal a host string is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpAddressType {
    V4,
    V6,
    /// Not an IP literal (hostname, CIDR, keyword)
    None,
}

/// Classify `host` as an IPv4 literal, an IPv6 literal or neither.
pub fn ip_address_type(host: &str) -> IpAddressType {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => IpAddressType::V4,
        Ok(IpAddr::V6(_)) => IpAddressType::V6,
        Err(_) => IpAddressType::None,
    }
}

/// One address bound to a local interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub interface: String,
    pub address: IpAddr,
    pub netmask: Option<IpAddr>,
}

impl InterfaceAddress {
    pub fn new(interface: impl Into<String>, address: IpAddr, netmask: Option<IpAddr>) -> Self {
        Self {
            interface: interface.into(),
            address,
            netmask,
        }
    }

    /// Enclosing network of this address, truncated to the network address.
    pub fn network(&self) -> Option<IpNet> {
        let netmask = self.netmask?;
        IpNet::with_netmask(self.address, netmask)
            .ok()
            .map(|net| net.trunc())
    }
}

/// First of `candidates` (in resolver order) bound to a local interface.
pub fn find_local_address(candidates: &[IpAddr], interfaces: &[InterfaceAddress]) -> Option<IpAddr> {
    candidates
        .iter()
        .copied()
        .find(|candidate| interfaces.iter().any(|i| i.address == *candidate))
}

/// Network of the first interface that carries `address` with a usable netmask.
pub fn find_local_cidr(address: IpAddr, interfaces: &[InterfaceAddress]) -> Option<IpNet> {
    interfaces
        .iter()
        .filter(|i| i.address == address)
        .find_map(InterfaceAddress::network)
}
