//! Idempotent edits of an HBA file
//!
//! The file is read whole, changed in memory and replaced whole:
//! 1. Write the new contents to a uniquely named temp file beside it
//! 2. fsync the temp file
//! 3. Rename over the original (atomic on POSIX), then fsync the directory
//!
//! Existing lines are never removed or reordered; a rule is only appended
//! when no line already starts with it.
//!
//! Concurrent editors (the agent plus an operator-run CLI) are not isolated
//! from each other between read and rename. Last writer wins; a rule lost
//! that way is appended again on the next reconciliation pass.

use std::fs::{self, File, Metadata, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::{fchown, MetadataExt};
use std::path::Path;

use uuid::Uuid;

use super::errors::{HbaError, HbaResult};
use super::rule::HbaRule;
use crate::observability::{log_event, trace_event, warn_event, Event, Logger};

/// Comment appended to every line written by aerokeeper
pub const HBA_LINE_COMMENT: &str = " # Auto-generated by aerokeeper";

/// What [`ensure_line`] did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The line was already there; the file is untouched
    AlreadyPresent,
    /// The line was appended
    Appended,
    /// The edit was skipped per the skip sentinel; the file is untouched
    Skipped,
}

impl EnsureOutcome {
    /// True when the file was rewritten.
    pub fn modified(&self) -> bool {
        matches!(self, EnsureOutcome::Appended)
    }
}

/// Whether `contents` holds `line` at the start of some line.
///
/// The match must also end the rule: at end of file, before whitespace
/// (including the newline), before a `#` comment, or before
/// `trailing_comment` (what [`ensure_line`] writes after the rule). Text that
/// only appears in the middle of another line, or a rule that is a prefix of
/// a longer one, does not count.
pub fn contains_line(contents: &[u8], line: &str, trailing_comment: &str) -> bool {
    let needle = line.as_bytes();
    let mut start = 0;

    loop {
        let rest = &contents[start..];
        if rest.starts_with(needle) && ends_rule(&rest[needle.len()..], trailing_comment) {
            return true;
        }
        match rest.iter().position(|b| *b == b'\n') {
            Some(pos) => start += pos + 1,
            None => return false,
        }
    }
}

fn ends_rule(rest: &[u8], trailing_comment: &str) -> bool {
    match rest.first() {
        None => true,
        Some(b) if b.is_ascii_whitespace() || *b == b'#' => true,
        Some(_) => !trailing_comment.is_empty() && rest.starts_with(trailing_comment.as_bytes()),
    }
}

/// Make sure `path` contains `line`, appending `line + trailing_comment + "\n"`
/// when it does not.
pub fn ensure_line(path: &Path, line: &str, trailing_comment: &str) -> HbaResult<EnsureOutcome> {
    let contents = fs::read(path).map_err(|source| HbaError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if contains_line(&contents, line, trailing_comment) {
        trace_event(
            Event::HbaRulePresent,
            &[("path", &path.display().to_string()), ("rule", line)],
        );
        return Ok(EnsureOutcome::AlreadyPresent);
    }

    let mut new_contents =
        Vec::with_capacity(contents.len() + line.len() + trailing_comment.len() + 2);
    new_contents.extend_from_slice(&contents);
    if !contents.is_empty() && !contents.ends_with(b"\n") {
        new_contents.push(b'\n');
    }
    new_contents.extend_from_slice(line.as_bytes());
    new_contents.extend_from_slice(trailing_comment.as_bytes());
    new_contents.push(b'\n');

    replace_file(path, &new_contents).map_err(|source| HbaError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(EnsureOutcome::Appended)
}

/// Make sure `path` grants `rule`, tagging new lines with [`HBA_LINE_COMMENT`].
///
/// A rule carrying the skip sentinel is logged at WARN with its literal text
/// so the operator can apply it by hand; the file is not opened.
pub fn ensure_host_rule(path: &Path, rule: &HbaRule) -> HbaResult<EnsureOutcome> {
    let line = rule.render();
    let path_str = path.display().to_string();

    if rule.is_skip() {
        warn_event(
            Event::HbaEditSkipped,
            &[
                ("path", &path_str),
                ("reason", "HBA edits disabled by --skip-pg-hba"),
                ("rule", &line),
            ],
        );
        return Ok(EnsureOutcome::Skipped);
    }

    Logger::trace("HBA_ENSURE_RULE", &[("path", &path_str), ("rule", &line)]);

    let outcome = ensure_line(path, &line, HBA_LINE_COMMENT)?;
    if outcome.modified() {
        log_event(Event::HbaRuleAdded, &[("path", &path_str), ("rule", &line)]);
    }
    Ok(outcome)
}

/// Replace the file at `path` with `contents` atomically, keeping its
/// permissions and ownership. Symlinks are resolved so the link itself
/// survives.
fn replace_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    let target = fs::canonicalize(path)?;
    let dir = target.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "HBA file has no parent directory")
    })?;
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pg_hba.conf".to_string());
    let temp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
    let original = fs::metadata(&target)?;

    let result = write_and_rename(&temp_path, &target, contents, &original);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_and_rename(
    temp_path: &Path,
    target: &Path,
    contents: &[u8],
    original: &Metadata,
) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    file.write_all(contents)?;

    // the server reads the file as its own owner, not as whoever edits it
    let created = file.metadata()?;
    if (created.uid(), created.gid()) != (original.uid(), original.gid()) {
        fchown(&file, Some(original.uid()), Some(original.gid()))?;
    }
    file.set_permissions(original.permissions())?;
    file.sync_all()?;
    drop(file);

    fs::rename(temp_path, target)?;

    if let Some(parent) = target.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hba::rule::{DatabaseSelector, Transport, UserSelector, SKIP_AUTH_METHOD};
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn hba_file(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("pg_hba.conf");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_contains_line_at_file_start() {
        assert!(contains_line(b"host all all 1.2.3.4/32 md5\n", "host all all 1.2.3.4/32 md5", ""));
    }

    #[test]
    fn test_contains_line_after_newline_with_comment() {
        let contents = b"local all all trust\nhost all all 1.2.3.4/32 md5 # Auto-generated by aerokeeper\n";
        assert!(contains_line(contents, "host all all 1.2.3.4/32 md5", HBA_LINE_COMMENT));
    }

    #[test]
    fn test_contains_line_rejects_mid_line_match() {
        assert!(!contains_line(b"xhost all all 1.2.3.4/32 md5\n", "host all all 1.2.3.4/32 md5", ""));
    }

    #[test]
    fn test_contains_line_checks_every_occurrence() {
        let contents = b"xhost all all 1.2.3.4/32 md5\nhost all all 1.2.3.4/32 md5\n";
        assert!(contains_line(contents, "host all all 1.2.3.4/32 md5", HBA_LINE_COMMENT));
    }

    #[test]
    fn test_contains_line_rejects_longer_rule() {
        let contents = b"host all all 10.0.0.0/24 trust\n";
        assert!(!contains_line(contents, "host all all 10.0.0.0/2", ""));
    }

    #[test]
    fn test_ensure_line_appends_once() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "local all all trust\n");

        let first = ensure_line(&path, "host all all 10.0.0.0/24 trust", " # comment").unwrap();
        let after_first = fs::read_to_string(&path).unwrap();
        let second = ensure_line(&path, "host all all 10.0.0.0/24 trust", " # comment").unwrap();
        let after_second = fs::read_to_string(&path).unwrap();

        assert_eq!(first, EnsureOutcome::Appended);
        assert_eq!(second, EnsureOutcome::AlreadyPresent);
        assert_eq!(after_first, after_second);
        assert_eq!(
            after_first,
            "local all all trust\nhost all all 10.0.0.0/24 trust # comment\n"
        );
    }

    #[test]
    fn test_ensure_line_terminates_unfinished_last_line() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "local all all trust");

        ensure_line(&path, "host all all 10.0.0.0/24 trust", "").unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "local all all trust\nhost all all 10.0.0.0/24 trust\n"
        );
    }

    #[test]
    fn test_ensure_line_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.conf");

        let err = ensure_line(&path, "host all all 10.0.0.0/24 trust", "").unwrap_err();
        assert!(err.is_read());
        assert_eq!(err.path(), &path);
        assert!(err.to_string().contains("missing.conf"));
    }

    #[test]
    fn test_ensure_line_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "");

        ensure_line(&path, "host all all 10.0.0.0/24 trust", HBA_LINE_COMMENT).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_ensure_line_finds_rule_behind_custom_comment() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "local all all trust\n");

        let first = ensure_line(&path, "host all all 10.0.0.0/24 trust", "-- managed").unwrap();
        let second = ensure_line(&path, "host all all 10.0.0.0/24 trust", "-- managed").unwrap();

        assert_eq!(first, EnsureOutcome::Appended);
        assert_eq!(second, EnsureOutcome::AlreadyPresent);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "local all all trust\nhost all all 10.0.0.0/24 trust-- managed\n"
        );
    }

    #[test]
    fn test_contains_line_accepts_only_the_given_comment() {
        let contents = b"host all all 10.0.0.0/24 trust-- managed\n";
        assert!(contains_line(contents, "host all all 10.0.0.0/24 trust", "-- managed"));
        assert!(!contains_line(contents, "host all all 10.0.0.0/24 trust", ""));
        assert!(!contains_line(contents, "host all all 10.0.0.0/24 trust", "-- other"));
    }

    #[test]
    fn test_ensure_line_preserves_owner() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "local all all trust\n");
        // as root, hand the file to another account the way postgres owns it
        if fs::metadata(&path).unwrap().uid() == 0 {
            std::os::unix::fs::chown(&path, Some(26), Some(26)).unwrap();
        }
        fs::set_permissions(&path, Permissions::from_mode(0o600)).unwrap();
        let before = fs::metadata(&path).unwrap();

        ensure_line(&path, "host all all 10.0.0.0/24 trust", HBA_LINE_COMMENT).unwrap();

        let after = fs::metadata(&path).unwrap();
        assert_eq!((after.uid(), after.gid()), (before.uid(), before.gid()));
        assert_eq!(after.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn test_ensure_line_preserves_permissions() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "local all all trust\n");
        fs::set_permissions(&path, Permissions::from_mode(0o600)).unwrap();

        ensure_line(&path, "host all all 10.0.0.0/24 trust", HBA_LINE_COMMENT).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_ensure_host_rule_tags_line() {
        let dir = TempDir::new().unwrap();
        let path = hba_file(&dir, "");
        let rule = HbaRule::new(
            Transport::Encrypted,
            DatabaseSelector::Named("app".to_string()),
            UserSelector::All,
            "10.1.0.0/16",
            "scram-sha-256",
        );

        let outcome = ensure_host_rule(&path, &rule).unwrap();

        assert_eq!(outcome, EnsureOutcome::Appended);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "hostssl \"app\" all 10.1.0.0/16 scram-sha-256 # Auto-generated by aerokeeper\n"
        );
    }

    #[test]
    fn test_ensure_host_rule_skip_does_not_touch_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.conf");
        let rule = HbaRule::new(
            Transport::Plain,
            DatabaseSelector::All,
            UserSelector::All,
            "10.1.0.0/16",
            SKIP_AUTH_METHOD,
        );

        let outcome = ensure_host_rule(&path, &rule).unwrap();

        assert_eq!(outcome, EnsureOutcome::Skipped);
        assert!(!path.exists());
    }
}
