//! Durable node state file
//!
//! Layout under the state directory:
//! - `aerokeeper.state`      JSON envelope {format_version, checksum, updated_at, state}
//! - `aerokeeper.state.lock` flock(2) target serializing writers
//!
//! Writes hold the exclusive lock for the whole temp-write/fsync/rename
//! sequence, so two processes never interleave partial writes. Reads take no
//! lock: rename is atomic, a reader sees either the old or the new file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StateError, StateResult};
use super::node_state::NodeState;
use crate::observability::{log_event, Event};

/// State file name
pub const STATE_FILE_NAME: &str = "aerokeeper.state";

/// Current on-disk format version
pub const STATE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    format_version: u32,
    checksum: u32,
    updated_at: DateTime<Utc>,
    state: NodeState,
}

/// Exclusive write access to the state file, released on drop.
struct StateLock {
    _flock: Flock<File>,
}

/// Reads and writes the node state file
#[derive(Debug, Clone)]
pub struct StateStore {
    state_path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
}

impl StateStore {
    /// Store rooted at `state_dir`. Nothing is touched until the first call.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_path: state_dir.join(STATE_FILE_NAME),
            lock_path: state_dir.join(format!("{}.lock", STATE_FILE_NAME)),
            temp_path: state_dir.join(format!("{}.tmp", STATE_FILE_NAME)),
        }
    }

    /// Path of the state file (for diagnostics).
    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Load the persisted state; `None` before the first store.
    pub fn load(&self) -> StateResult<Option<NodeState>> {
        let content = match fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StateError::io(format!(
                    "failed to read state file {}: {}",
                    self.state_path.display(),
                    e
                )))
            }
        };

        let file: StateFile = serde_json::from_str(&content).map_err(|e| {
            StateError::corrupt(format!(
                "failed to parse state file {}: {}",
                self.state_path.display(),
                e
            ))
        })?;

        if file.format_version != STATE_FORMAT_VERSION {
            return Err(StateError::corrupt(format!(
                "state file {} has format version {}, expected {}",
                self.state_path.display(),
                file.format_version,
                STATE_FORMAT_VERSION
            )));
        }

        let payload = encode_state(&file.state)?;
        if !verify_checksum(&payload, file.checksum) {
            return Err(StateError::corrupt(format!(
                "state file {} failed its checksum",
                self.state_path.display()
            )));
        }

        let node_id = file
            .state
            .node_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "none".to_string());
        log_event(
            Event::StateLoaded,
            &[
                ("node_id", &node_id),
                ("path", &self.state_path.display().to_string()),
                ("stage", file.state.stage.as_str()),
            ],
        );

        Ok(Some(file.state))
    }

    /// Persist `state`, replacing whatever was there.
    pub fn store(&self, state: &NodeState) -> StateResult<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StateError::io(format!(
                    "failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let payload = encode_state(state)?;
        let file = StateFile {
            format_version: STATE_FORMAT_VERSION,
            checksum: compute_checksum(&payload),
            updated_at: Utc::now(),
            state: state.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| StateError::serialization(format!("failed to encode state file: {}", e)))?;

        let _lock = self.lock()?;
        self.write_atomic(content.as_bytes())?;

        log_event(
            Event::StateStored,
            &[
                ("path", &self.state_path.display().to_string()),
                ("stage", state.stage.as_str()),
            ],
        );
        Ok(())
    }

    fn lock(&self) -> StateResult<StateLock> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| {
                StateError::io(format!(
                    "failed to open state lock {}: {}",
                    self.lock_path.display(),
                    e
                ))
            })?;

        let flock = Flock::lock(file, FlockArg::LockExclusive).map_err(|(_, errno)| {
            StateError::lock(format!(
                "failed to lock {}: {}",
                self.lock_path.display(),
                errno
            ))
        })?;

        Ok(StateLock { _flock: flock })
    }

    fn write_atomic(&self, content: &[u8]) -> StateResult<()> {
        let io_err = |what: &str, e: std::io::Error| {
            StateError::io(format!(
                "failed to {} {}: {}",
                what,
                self.temp_path.display(),
                e
            ))
        };

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.temp_path)
            .map_err(|e| io_err("create", e))?;
        file.write_all(content).map_err(|e| io_err("write", e))?;
        file.sync_all().map_err(|e| io_err("fsync", e))?;
        drop(file);

        fs::rename(&self.temp_path, &self.state_path).map_err(|e| {
            StateError::io(format!(
                "failed to commit state file {}: {}",
                self.state_path.display(),
                e
            ))
        })?;

        if let Some(parent) = self.state_path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }
}

fn encode_state(state: &NodeState) -> StateResult<Vec<u8>> {
    serde_json::to_vec(state)
        .map_err(|e| StateError::serialization(format!("failed to encode node state: {}", e)))
}
