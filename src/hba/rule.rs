//! HBA rule model and rendering
//!
//! A rule renders to one `pg_hba.conf` line:
//!
//! ```text
//! <host|hostssl> <database> <user> <address> <method>
//! ```
//!
//! Named databases and users are always written double-quoted, with every
//! embedded double quote doubled. PostgreSQL's tokenizer reads `""` inside a
//! quoted token as a literal `"`.

use std::fmt;

use crate::network::{ip_address_type, IpAddressType};

/// Authentication method meaning "do not edit the HBA file".
///
/// Set by `--skip-pg-hba`: the operator manages access control by hand, so
/// rules are computed and logged but never written.
pub const SKIP_AUTH_METHOD: &str = "skip";

/// Whether `method` is the skip sentinel.
pub fn is_skip_auth_method(method: &str) -> bool {
    method == SKIP_AUTH_METHOD
}

/// Connection type of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// `host`: plain or SSL TCP connections
    Plain,
    /// `hostssl`: SSL-only TCP connections
    Encrypted,
}

impl Transport {
    /// Transport for the `ssl` flag of a node
    pub fn from_ssl(ssl: bool) -> Self {
        if ssl {
            Transport::Encrypted
        } else {
            Transport::Plain
        }
    }

    /// First field of the HBA line
    pub fn keyword(&self) -> &'static str {
        match self {
            Transport::Plain => "host",
            Transport::Encrypted => "hostssl",
        }
    }
}

/// Database field of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseSelector {
    /// Every database
    All,
    /// Physical replication connections
    Replication,
    /// One database, by name
    Named(String),
}

impl DatabaseSelector {
    fn render(&self) -> String {
        match self {
            DatabaseSelector::All => "all".to_string(),
            DatabaseSelector::Replication => "replication".to_string(),
            DatabaseSelector::Named(name) => escape_hba_string(name),
        }
    }
}

/// User field of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserSelector {
    /// Every role
    All,
    /// One role, by name
    Named(String),
}

impl UserSelector {
    fn render(&self) -> String {
        match self {
            UserSelector::All => "all".to_string(),
            UserSelector::Named(name) => escape_hba_string(name),
        }
    }
}

/// Which database and user a grant is for; the address and method are
/// filled in when the grant is resolved into an [`HbaRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTemplate {
    pub database: DatabaseSelector,
    pub user: UserSelector,
}

impl RuleTemplate {
    pub fn new(database: DatabaseSelector, user: UserSelector) -> Self {
        Self { database, user }
    }

    /// Grant on one named database for one named user.
    pub fn database_user(database: &str, user: &str) -> Self {
        Self::new(
            DatabaseSelector::Named(database.to_string()),
            UserSelector::Named(user.to_string()),
        )
    }

    /// Grant on the replication pseudo-database for one named user.
    pub fn replication(user: &str) -> Self {
        Self::new(
            DatabaseSelector::Replication,
            UserSelector::Named(user.to_string()),
        )
    }
}

/// One access-control entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HbaRule {
    transport: Transport,
    database: DatabaseSelector,
    user: UserSelector,
    host: String,
    auth_method: String,
}

impl HbaRule {
    pub fn new(
        transport: Transport,
        database: DatabaseSelector,
        user: UserSelector,
        host: impl Into<String>,
        auth_method: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            database,
            user,
            host: host.into(),
            auth_method: auth_method.into(),
        }
    }

    /// Build the rule a template resolves to for `host`.
    pub fn from_template(
        ssl: bool,
        template: &RuleTemplate,
        host: impl Into<String>,
        auth_method: impl Into<String>,
    ) -> Self {
        Self::new(
            Transport::from_ssl(ssl),
            template.database.clone(),
            template.user.clone(),
            host,
            auth_method,
        )
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn database(&self) -> &DatabaseSelector {
        &self.database
    }

    pub fn user(&self) -> &UserSelector {
        &self.user
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn auth_method(&self) -> &str {
        &self.auth_method
    }

    /// True when the rule carries the skip sentinel and must not be written.
    pub fn is_skip(&self) -> bool {
        is_skip_auth_method(&self.auth_method)
    }

    /// Render the rule as an HBA line, without trailing comment or newline.
    pub fn render(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.transport.keyword(),
            self.database.render(),
            self.user.render(),
            format_host(&self.host),
            self.auth_method
        )
    }
}

impl fmt::Display for HbaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Address field for `host`: a bare IPv4 address becomes `/32`, a bare IPv6
/// address becomes `/128`, anything else (hostname, CIDR) is kept verbatim.
pub fn format_host(host: &str) -> String {
    match ip_address_type(host) {
        IpAddressType::V4 => format!("{}/32", host),
        IpAddressType::V6 => format!("{}/128", host),
        IpAddressType::None => host.to_string(),
    }
}

/// Quote a database or user name for an HBA file.
pub fn escape_hba_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        if c == '"' {
            escaped.push('"');
        }
        escaped.push(c);
    }
    escaped.push('"');
    escaped
}

/// Inverse of [`escape_hba_string`].
///
/// Returns `None` when `field` is not a well-formed quoted token: missing
/// surrounding quotes, or a lone `"` inside.
pub fn unescape_hba_string(field: &str) -> Option<String> {
    let inner = field.strip_prefix('"')?.strip_suffix('"')?;

    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.next() != Some('"') {
                return None;
            }
        }
        value.push(c);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_all_all() {
        let rule = HbaRule::new(
            Transport::Plain,
            DatabaseSelector::All,
            UserSelector::All,
            "10.0.0.0/24",
            "trust",
        );
        assert_eq!(rule.render(), "host all all 10.0.0.0/24 trust");
    }

    #[test]
    fn test_render_hostssl_replication() {
        let rule = HbaRule::from_template(
            true,
            &RuleTemplate::replication("aerokeeper_replicator"),
            "192.168.1.0/24",
            "scram-sha-256",
        );
        assert_eq!(
            rule.render(),
            "hostssl replication \"aerokeeper_replicator\" 192.168.1.0/24 scram-sha-256"
        );
    }

    #[test]
    fn test_render_quotes_named_database() {
        let rule = HbaRule::from_template(
            false,
            &RuleTemplate::database_user("my\"db", "app"),
            "db.example.com",
            "md5",
        );
        assert_eq!(
            rule.render(),
            "host \"my\"\"db\" \"app\" db.example.com md5"
        );
    }

    #[test]
    fn test_format_host() {
        assert_eq!(format_host("1.2.3.4"), "1.2.3.4/32");
        assert_eq!(format_host("fe80::1"), "fe80::1/128");
        assert_eq!(format_host("10.0.0.0/8"), "10.0.0.0/8");
        assert_eq!(format_host("node-a.internal"), "node-a.internal");
    }

    #[test]
    fn test_escape_and_unescape() {
        assert_eq!(escape_hba_string("plain"), "\"plain\"");
        assert_eq!(escape_hba_string("a\"b"), "\"a\"\"b\"");
        assert_eq!(escape_hba_string(""), "\"\"");

        assert_eq!(unescape_hba_string("\"a\"\"b\"").as_deref(), Some("a\"b"));
        assert_eq!(unescape_hba_string("\"a\"b\""), None);
        assert_eq!(unescape_hba_string("unquoted"), None);
    }

    #[test]
    fn test_skip_sentinel() {
        assert!(is_skip_auth_method("skip"));
        assert!(!is_skip_auth_method("trust"));

        let rule = HbaRule::new(
            Transport::Plain,
            DatabaseSelector::All,
            UserSelector::All,
            "10.0.0.0/8",
            SKIP_AUTH_METHOD,
        );
        assert!(rule.is_skip());
    }
}
