//! HBA (host-based authentication) file handling
//!
//! Renders access-control rules to `pg_hba.conf` lines and merges them into
//! an existing file without disturbing what is already there.

mod errors;
mod file;
mod rule;

pub use errors::{HbaError, HbaResult};
pub use file::{contains_line, ensure_host_rule, ensure_line, EnsureOutcome, HBA_LINE_COMMENT};
pub use rule::{
    escape_hba_string, format_host, is_skip_auth_method, unescape_hba_string, DatabaseSelector,
    HbaRule, RuleTemplate, Transport, UserSelector, SKIP_AUTH_METHOD,
};
