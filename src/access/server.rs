//! Database server control surface
//!
//! Two questions are asked of the running server: where its HBA file is, and
//! to reload its configuration after that file changed.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::errors::{AccessError, AccessResult};
use crate::observability::Logger;

/// HBA file name inside a data directory
pub const HBA_FILE_NAME: &str = "pg_hba.conf";

/// A running database server this node controls
pub trait DatabaseServer {
    /// Path of the HBA file the server reads.
    fn hba_file_path(&self) -> AccessResult<PathBuf>;

    /// Ask the server to re-read its configuration files.
    fn reload_configuration(&self) -> AccessResult<()>;
}

impl<T: DatabaseServer + ?Sized> DatabaseServer for &T {
    fn hba_file_path(&self) -> AccessResult<PathBuf> {
        (**self).hba_file_path()
    }

    fn reload_configuration(&self) -> AccessResult<()> {
        (**self).reload_configuration()
    }
}

/// HBA file of an offline data directory
pub fn offline_hba_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HBA_FILE_NAME)
}

/// Server reached through the `psql` client
#[derive(Debug, Clone)]
pub struct PsqlServer {
    psql_path: PathBuf,
    connection: String,
}

impl PsqlServer {
    pub fn new(psql_path: impl Into<PathBuf>, connection: impl Into<String>) -> Self {
        Self {
            psql_path: psql_path.into(),
            connection: connection.into(),
        }
    }

    /// Run one statement, returning its unaligned tuples-only output.
    fn query(&self, sql: &str) -> Result<String, String> {
        Logger::trace(
            "PSQL_QUERY",
            &[("psql", &self.psql_path.display().to_string()), ("sql", sql)],
        );

        let output = Command::new(&self.psql_path)
            .args(["-X", "-A", "-t", "-v", "ON_ERROR_STOP=1", "-d"])
            .arg(&self.connection)
            .args(["-c", sql])
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.psql_path.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "{} exited with {}: {}",
                self.psql_path.display(),
                output.status,
                stderr.trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl DatabaseServer for PsqlServer {
    fn hba_file_path(&self) -> AccessResult<PathBuf> {
        let path = self
            .query("SHOW hba_file")
            .map_err(|reason| AccessError::HbaPath { reason })?;

        if path.is_empty() {
            return Err(AccessError::HbaPath {
                reason: "server reported an empty hba_file setting".to_string(),
            });
        }
        Ok(PathBuf::from(path))
    }

    fn reload_configuration(&self) -> AccessResult<()> {
        let answer = self
            .query("SELECT pg_reload_conf()")
            .map_err(|reason| AccessError::Reload { reason })?;

        if answer != "t" {
            return Err(AccessError::Reload {
                reason: format!("pg_reload_conf() returned \"{}\"", answer),
            });
        }
        Ok(())
    }
}
