//! Local network access grants
//!
//! One grant opens the node's local network to one (database, user) pair:
//!
//! 1. hostname → local address (fatal unless edits are skipped)
//! 2. local address → enclosing CIDR (a warning, never fatal)
//! 3. HBA file path: `<data_dir>/pg_hba.conf` offline, else asked of the server
//! 4. ensure the rule is in the file
//! 5. reload the server, when it is running and edits are not skipped

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use ipnet::IpNet;

use super::errors::AccessResult;
use super::server::{offline_hba_file_path, DatabaseServer};
use crate::hba::{ensure_host_rule, is_skip_auth_method, EnsureOutcome, HbaRule, RuleTemplate};
use crate::network::NetworkLocator;
use crate::observability::{log_event, warn_event, Event, Logger};

/// What to grant, and to whom
#[derive(Debug, Clone, Copy)]
pub struct LanAccessRequest<'a> {
    pub ssl: bool,
    pub template: &'a RuleTemplate,
    /// Hostname the node registers under
    pub hostname: &'a str,
    pub auth_method: &'a str,
    /// Data directory of a server that is not running yet
    pub offline_data_dir: Option<&'a Path>,
}

/// Result of one grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The rule is in the HBA file
    Granted {
        cidr: IpNet,
        path: PathBuf,
        rule: String,
        appended: bool,
    },
    /// HBA edits are disabled; the rule was logged instead
    Skipped { cidr: IpNet, path: PathBuf, rule: String },
    /// Edits are disabled and the hostname has no local address
    NoLocalAddress { hostname: String, reason: String },
    /// The local address belongs to no known network
    NoLocalNetwork { address: IpAddr, reason: String },
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantOutcome::Granted { .. })
    }

    /// Whether the HBA file was changed.
    pub fn appended(&self) -> bool {
        matches!(self, GrantOutcome::Granted { appended: true, .. })
    }

    /// Message for the operator when the grant did not happen.
    pub fn warning(&self) -> Option<String> {
        match self {
            GrantOutcome::Granted { .. } => None,
            GrantOutcome::Skipped { path, rule, .. } => Some(format!(
                "HBA edits are disabled, add \"{}\" to {} by hand",
                rule,
                path.display()
            )),
            GrantOutcome::NoLocalAddress { hostname, reason } => Some(format!(
                "no local address for hostname \"{}\": {}",
                hostname, reason
            )),
            GrantOutcome::NoLocalNetwork { address, reason } => Some(format!(
                "skipped HBA settings for \"{}\": {}",
                address, reason
            )),
        }
    }
}

impl fmt::Display for GrantOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantOutcome::Granted { cidr, path, appended, .. } => write!(
                f,
                "granted {} in {} ({})",
                cidr,
                path.display(),
                if *appended { "added" } else { "present" }
            ),
            other => match other.warning() {
                Some(warning) => f.write_str(&warning),
                None => Ok(()),
            },
        }
    }
}

/// Grants local network access through a locator
#[derive(Debug, Clone)]
pub struct AccessSynchronizer<L: NetworkLocator> {
    locator: L,
}

impl<L: NetworkLocator> AccessSynchronizer<L> {
    pub fn new(locator: L) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// Open the node's local network to `request.template` in the HBA file.
    ///
    /// With the skip sentinel every step but the write runs, so the operator
    /// sees the exact rule to apply by hand, and nothing is fatal.
    pub fn grant_local_network_access(
        &self,
        server: &dyn DatabaseServer,
        request: &LanAccessRequest<'_>,
    ) -> AccessResult<GrantOutcome> {
        let skip = is_skip_auth_method(request.auth_method);

        let address = match self.locator.resolve_local_address(request.hostname) {
            Ok(address) => address,
            Err(e) if skip => {
                warn_event(
                    Event::HbaEditSkipped,
                    &[("hostname", request.hostname), ("reason", &e.to_string())],
                );
                return Ok(GrantOutcome::NoLocalAddress {
                    hostname: request.hostname.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                Logger::fatal(
                    "HBA_ADDRESS_UNRESOLVED",
                    &[("hostname", request.hostname), ("reason", &e.to_string())],
                );
                return Err(e.into());
            }
        };
        let address_str = address.to_string();

        let cidr = match self.locator.resolve_local_cidr(address) {
            Ok(cidr) => cidr,
            Err(e) => {
                warn_event(
                    Event::HbaEditSkipped,
                    &[("address", &address_str), ("reason", &e.to_string())],
                );
                return Ok(GrantOutcome::NoLocalNetwork {
                    address,
                    reason: e.to_string(),
                });
            }
        };
        let cidr_str = cidr.to_string();

        let path = match request.offline_data_dir {
            Some(data_dir) => offline_hba_file_path(data_dir),
            None => server.hba_file_path()?,
        };
        let path_str = path.display().to_string();

        log_event(
            Event::HbaNetworkResolved,
            &[
                ("address", &address_str),
                ("cidr", &cidr_str),
                ("hostname", request.hostname),
                ("path", &path_str),
            ],
        );

        let rule = HbaRule::from_template(request.ssl, request.template, cidr_str, request.auth_method);
        let outcome = ensure_host_rule(&path, &rule)?;

        if request.offline_data_dir.is_none() && !skip {
            server.reload_configuration()?;
            log_event(Event::ServerReloaded, &[("path", &path_str)]);
        }

        let rule = rule.render();
        Ok(match outcome {
            EnsureOutcome::Skipped => GrantOutcome::Skipped { cidr, path, rule },
            EnsureOutcome::AlreadyPresent => GrantOutcome::Granted {
                cidr,
                path,
                rule,
                appended: false,
            },
            EnsureOutcome::Appended => GrantOutcome::Granted {
                cidr,
                path,
                rule,
                appended: true,
            },
        })
    }
}
