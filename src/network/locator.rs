//! Hostname → local address → local network
//!
//! Locators answer two read-only questions about the host's networking
//! state. Nothing is cached: every call looks again.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddrV4, SocketAddrV6, ToSocketAddrs};

use ipnet::IpNet;
use nix::ifaddrs::getifaddrs;
use nix::sys::socket::SockaddrStorage;

use super::address::{find_local_address, find_local_cidr, InterfaceAddress};
use super::errors::{NetworkError, NetworkResult};

/// Maps a node's hostname onto the local network
pub trait NetworkLocator {
    /// IP address by which this machine is reachable as `hostname`.
    fn resolve_local_address(&self, hostname: &str) -> NetworkResult<IpAddr>;

    /// Enclosing local network of `address`, e.g. `192.168.0.0/23`.
    fn resolve_local_cidr(&self, address: IpAddr) -> NetworkResult<IpNet>;
}

fn no_local_address(hostname: &str, candidates: &[IpAddr]) -> NetworkError {
    let resolved = candidates
        .iter()
        .map(IpAddr::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    NetworkError::NoLocalAddress {
        hostname: hostname.to_string(),
        resolved,
    }
}

/// Locator backed by the system resolver and `getifaddrs(3)`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemNetworkLocator;

impl SystemNetworkLocator {
    pub fn new() -> Self {
        Self
    }

    /// Addresses `hostname` resolves to, in resolver order; IP literals are
    /// returned as-is without a lookup.
    fn resolve(hostname: &str) -> NetworkResult<Vec<IpAddr>> {
        if let Ok(ip) = hostname.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }

        let addrs = (hostname, 0u16)
            .to_socket_addrs()
            .map_err(|source| NetworkError::Resolve {
                hostname: hostname.to_string(),
                source,
            })?;

        let mut ips: Vec<IpAddr> = Vec::new();
        for addr in addrs {
            if !ips.contains(&addr.ip()) {
                ips.push(addr.ip());
            }
        }
        Ok(ips)
    }

    /// Every address currently bound to a local interface.
    pub fn interfaces() -> NetworkResult<Vec<InterfaceAddress>> {
        let addrs = getifaddrs().map_err(|e| NetworkError::Interfaces(e.to_string()))?;

        Ok(addrs
            .filter_map(|ifaddr| {
                let address = ifaddr.address.as_ref().and_then(storage_ip)?;
                let netmask = ifaddr.netmask.as_ref().and_then(storage_ip);
                Some(InterfaceAddress::new(ifaddr.interface_name, address, netmask))
            })
            .collect())
    }
}

fn storage_ip(storage: &SockaddrStorage) -> Option<IpAddr> {
    if let Some(sin) = storage.as_sockaddr_in() {
        return Some(IpAddr::V4(*SocketAddrV4::from(*sin).ip()));
    }
    if let Some(sin6) = storage.as_sockaddr_in6() {
        return Some(IpAddr::V6(*SocketAddrV6::from(*sin6).ip()));
    }
    None
}

impl NetworkLocator for SystemNetworkLocator {
    fn resolve_local_address(&self, hostname: &str) -> NetworkResult<IpAddr> {
        let candidates = Self::resolve(hostname)?;
        let interfaces = Self::interfaces()?;

        find_local_address(&candidates, &interfaces)
            .ok_or_else(|| no_local_address(hostname, &candidates))
    }

    fn resolve_local_cidr(&self, address: IpAddr) -> NetworkResult<IpNet> {
        let interfaces = Self::interfaces()?;

        find_local_cidr(address, &interfaces).ok_or(NetworkError::NoLocalNetwork { address })
    }
}

/// Locator over fixed host and interface tables.
///
/// Used where the real network must not matter: tests, and preparing rules
/// for a machine other than the one running the command.
#[derive(Debug, Default, Clone)]
pub struct StaticNetworkLocator {
    hosts: HashMap<String, Vec<IpAddr>>,
    interfaces: Vec<InterfaceAddress>,
}

impl StaticNetworkLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `hostname` resolve to `addresses`, in that order.
    pub fn with_host(mut self, hostname: &str, addresses: &[IpAddr]) -> Self {
        self.hosts.insert(hostname.to_string(), addresses.to_vec());
        self
    }

    /// Bind `address` with `netmask` to a pretend interface.
    pub fn with_interface(mut self, name: &str, address: IpAddr, netmask: Option<IpAddr>) -> Self {
        self.interfaces
            .push(InterfaceAddress::new(name, address, netmask));
        self
    }
}

impl NetworkLocator for StaticNetworkLocator {
    fn resolve_local_address(&self, hostname: &str) -> NetworkResult<IpAddr> {
        let candidates = match hostname.parse::<IpAddr>() {
            Ok(ip) => vec![ip],
            Err(_) => self.hosts.get(hostname).cloned().unwrap_or_default(),
        };

        find_local_address(&candidates, &self.interfaces)
            .ok_or_else(|| no_local_address(hostname, &candidates))
    }

    fn resolve_local_cidr(&self, address: IpAddr) -> NetworkResult<IpNet> {
        find_local_cidr(address, &self.interfaces).ok_or(NetworkError::NoLocalNetwork { address })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn locator() -> StaticNetworkLocator {
        StaticNetworkLocator::new()
            .with_host("node-a", &[ip("198.51.100.7"), ip("10.0.3.14")])
            .with_interface("eth0", ip("10.0.3.14"), Some(ip("255.255.255.0")))
    }

    #[test]
    fn test_static_resolves_hostname() {
        let l = locator();
        let addr = l.resolve_local_address("node-a").unwrap();
        assert_eq!(addr, ip("10.0.3.14"));
        assert_eq!(l.resolve_local_cidr(addr).unwrap().to_string(), "10.0.3.0/24");
    }

    #[test]
    fn test_static_unknown_host_is_not_found() {
        let err = locator().resolve_local_address("node-b").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("node-b"));
    }

    #[test]
    fn test_static_ip_literal_hostname() {
        let l = locator();
        assert_eq!(l.resolve_local_address("10.0.3.14").unwrap(), ip("10.0.3.14"));
    }

    #[test]
    fn test_static_unbound_address_has_no_network() {
        let err = locator().resolve_local_cidr(ip("198.51.100.7")).unwrap_err();
        assert!(matches!(err, NetworkError::NoLocalNetwork { .. }));
    }

    #[test]
    fn test_system_loopback_is_local() {
        // sandboxed runners may hide interfaces entirely
        let l = SystemNetworkLocator::new();
        let interfaces = SystemNetworkLocator::interfaces().unwrap_or_default();
        if interfaces.iter().any(|i| i.address == ip("127.0.0.1")) {
            assert_eq!(l.resolve_local_address("127.0.0.1").unwrap(), ip("127.0.0.1"));
        }
    }
}
