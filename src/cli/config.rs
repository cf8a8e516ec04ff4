//! Configuration file
//!
//! A single JSON object. Only `node_name`, `hostname`, `monitor_uri` and
//! `state_dir` are required; everything else has a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::args::HbaArgs;
use super::errors::{CliError, CliResult};
use crate::engine::NodeContext;
use crate::observability::Severity;
use crate::topology::{validate_formation_name, GroupId};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Name this node registers under (required)
    pub node_name: String,

    /// Hostname other nodes use to reach this one (required)
    pub hostname: String,

    #[serde(default = "default_formation")]
    pub formation: String,

    #[serde(default)]
    pub group: GroupId,

    /// Monitor base URI, e.g. `http://monitor:8080` (required)
    pub monitor_uri: String,

    /// Bound on each monitor call (default 5000)
    #[serde(default = "default_monitor_timeout_ms")]
    pub monitor_timeout_ms: u64,

    /// Directory holding the node state file (required)
    pub state_dir: String,

    /// Data directory, used by `--offline`
    #[serde(default)]
    pub pgdata: Option<String>,

    #[serde(default = "default_pg_connection")]
    pub pg_connection: String,

    #[serde(default = "default_psql_path")]
    pub psql_path: String,

    #[serde(default = "default_dbname")]
    pub dbname: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_replication_user")]
    pub replication_user: String,

    /// HBA authentication method for granted rules
    #[serde(default = "default_auth_method")]
    pub auth_method: String,

    /// Grant `hostssl` instead of `host` rules
    #[serde(default)]
    pub ssl: bool,

    /// trace, info, warn, error or fatal (default info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_formation() -> String {
    "default".to_string()
}
fn default_monitor_timeout_ms() -> u64 {
    5000
}
fn default_pg_connection() -> String {
    "postgres://localhost/postgres".to_string()
}
fn default_psql_path() -> String {
    "psql".to_string()
}
fn default_dbname() -> String {
    "postgres".to_string()
}
fn default_username() -> String {
    "aerokeeper".to_string()
}
fn default_replication_user() -> String {
    "aerokeeper_replicator".to_string()
}
fn default_auth_method() -> String {
    "trust".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::parse(&content)
    }

    /// Parse and validate a configuration document
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        let required = [
            ("node_name", &self.node_name),
            ("hostname", &self.hostname),
            ("monitor_uri", &self.monitor_uri),
            ("state_dir", &self.state_dir),
            ("dbname", &self.dbname),
            ("username", &self.username),
            ("replication_user", &self.replication_user),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CliError::config_error(format!("{} must not be empty", field)));
            }
        }

        validate_formation_name(&self.formation)
            .map_err(|e| CliError::config_error(e.to_string()))?;

        if self.group < 0 {
            return Err(CliError::config_error(format!(
                "group must be >= 0, got {}",
                self.group
            )));
        }

        if !(self.monitor_uri.starts_with("http://") || self.monitor_uri.starts_with("https://")) {
            return Err(CliError::config_error(format!(
                "monitor_uri must be an http:// or https:// URI, got '{}'",
                self.monitor_uri
            )));
        }

        if self.monitor_timeout_ms == 0 {
            return Err(CliError::config_error("monitor_timeout_ms must be > 0"));
        }

        if self.auth_method.is_empty() || self.auth_method.chars().any(char::is_whitespace) {
            return Err(CliError::config_error(format!(
                "Invalid auth_method: '{}'",
                self.auth_method
            )));
        }

        self.severity()?;

        Ok(())
    }

    /// Minimum log severity
    pub fn severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!("Invalid log_level: '{}'", self.log_level))
        })
    }

    pub fn monitor_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_timeout_ms)
    }

    /// Node context for this configuration and the command-line HBA flags.
    pub fn node_context(&self, hba: HbaArgs) -> CliResult<NodeContext> {
        let mut context = NodeContext::new(
            self.node_name.clone(),
            self.hostname.clone(),
            PathBuf::from(&self.state_dir),
        )
        .with_assignment(self.formation.clone(), self.group);

        context.ssl = self.ssl;
        context.auth_method = self.auth_method.clone();
        context.dbname = self.dbname.clone();
        context.username = self.username.clone();
        context.replication_user = self.replication_user.clone();

        if hba.skip_pg_hba {
            context = context.skip_hba();
        }
        if hba.offline {
            let pgdata = self
                .pgdata
                .as_deref()
                .ok_or_else(|| CliError::config_error("--offline requires pgdata in the config"))?;
            context = context.offline(pgdata);
        }

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use std::path::Path;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{
        "node_name": "node-a",
        "hostname": "node-a.local",
        "monitor_uri": "http://monitor:8080",
        "state_dir": "/var/lib/aerokeeper"
    }"#;

    #[test]
    fn test_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.formation, "default");
        assert_eq!(config.group, 0);
        assert_eq!(config.monitor_timeout(), Duration::from_secs(5));
        assert_eq!(config.pg_connection, "postgres://localhost/postgres");
        assert_eq!(config.psql_path, "psql");
        assert_eq!(config.auth_method, "trust");
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert!(!config.ssl);
        assert!(config.pgdata.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("aerokeeper.json");
        fs::write(&path, MINIMAL).unwrap();

        assert_eq!(Config::load(&path).unwrap().node_name, "node-a");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/aerokeeper.json")).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_missing_required_field() {
        let err = Config::parse(r#"{"node_name": "node-a"}"#).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            r#""formation": """#,
            r#""group": -1"#,
            r#""monitor_timeout_ms": 0"#,
            r#""auth_method": "md5 trust""#,
            r#""log_level": "loud""#,
        ];
        for field in bad {
            let doc = MINIMAL.replacen('{', &format!("{{ {},", field), 1);
            assert!(Config::parse(&doc).is_err(), "accepted {}", field);
        }

        let doc = MINIMAL.replace("http://monitor:8080", "monitor:8080");
        assert!(Config::parse(&doc).is_err());
    }

    #[test]
    fn test_node_context_flags() {
        let doc = MINIMAL.replacen('{', r#"{ "pgdata": "/data", "ssl": true,"#, 1);
        let config = Config::parse(&doc).unwrap();

        let context = config
            .node_context(HbaArgs {
                skip_pg_hba: true,
                offline: true,
            })
            .unwrap();

        assert_eq!(context.auth_method, "skip");
        assert_eq!(context.offline_data_dir(), Some(Path::new("/data")));
        assert!(context.ssl);
    }

    #[test]
    fn test_offline_requires_pgdata() {
        let config = Config::parse(MINIMAL).unwrap();

        let err = config
            .node_context(HbaArgs {
                skip_pg_hba: false,
                offline: true,
            })
            .unwrap_err();

        assert_eq!(err.code(), CliErrorCode::ConfigError);
    }
}
