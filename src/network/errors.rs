//! Network resolution error types

use std::io;
use std::net::IpAddr;

use thiserror::Error;

/// Result type for network resolution
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Failures to map a hostname onto the local network
#[derive(Debug, Error)]
pub enum NetworkError {
    /// DNS (or /etc/hosts) lookup failed
    #[error("failed to resolve hostname \"{hostname}\": {source}")]
    Resolve {
        hostname: String,
        #[source]
        source: io::Error,
    },

    /// The hostname resolved, but to no address bound on this machine
    #[error("hostname \"{hostname}\" resolves to no local address (resolved: {resolved})")]
    NoLocalAddress { hostname: String, resolved: String },

    /// No local interface carries the address, or it has no netmask
    #[error("no local network found for IP address \"{address}\"")]
    NoLocalNetwork { address: IpAddr },

    /// Listing the local interfaces failed
    #[error("failed to list network interfaces: {0}")]
    Interfaces(String),
}

impl NetworkError {
    /// True for "looked, found nothing" as opposed to a failed lookup.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            NetworkError::NoLocalAddress { .. } | NetworkError::NoLocalNetwork { .. }
        )
    }
}
