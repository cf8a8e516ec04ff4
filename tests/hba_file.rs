//! HBA file editing against real files
//!
//! - Appending is idempotent and leaves exactly one line per rule
//! - Matching is anchored at line starts
//! - Rendering quotes names and widens bare addresses to host networks

use aerokeeper::hba::{
    contains_line, ensure_host_rule, ensure_line, escape_hba_string, format_host,
    unescape_hba_string, EnsureOutcome, HbaRule, RuleTemplate, HBA_LINE_COMMENT,
};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

const STOCK_HBA: &str = "\
# TYPE  DATABASE        USER            ADDRESS                 METHOD
local   all             all                                     trust
host    all             all             127.0.0.1/32            trust
";

#[test]
fn test_ensure_line_appends_exactly_one_line() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pg_hba.conf");
    fs::write(&path, STOCK_HBA).unwrap();

    let outcome = ensure_line(&path, "host all all 10.0.0.0/24 trust", " # comment").unwrap();

    assert_eq!(outcome, EnsureOutcome::Appended);
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        format!("{}host all all 10.0.0.0/24 trust # comment\n", STOCK_HBA)
    );
    assert_eq!(contents.matches("10.0.0.0/24").count(), 1);
}

#[test]
fn test_ensure_line_twice_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pg_hba.conf");
    fs::write(&path, STOCK_HBA).unwrap();

    ensure_line(&path, "host all all 10.0.0.0/24 trust", HBA_LINE_COMMENT).unwrap();
    let once = fs::read(&path).unwrap();
    let outcome = ensure_line(&path, "host all all 10.0.0.0/24 trust", HBA_LINE_COMMENT).unwrap();

    assert_eq!(outcome, EnsureOutcome::AlreadyPresent);
    assert_eq!(fs::read(&path).unwrap(), once);
}

#[test]
fn test_match_is_anchored_at_line_start() {
    let contents = b"xhost all all 1.2.3.4/32 md5\n";

    assert!(!contains_line(contents, "host all all 1.2.3.4/32 md5", HBA_LINE_COMMENT));
    assert!(contains_line(
        b"local all all trust\nhost all all 1.2.3.4/32 md5\n",
        "host all all 1.2.3.4/32 md5",
        HBA_LINE_COMMENT
    ));
}

#[test]
fn test_prefixed_line_is_appended_separately() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pg_hba.conf");
    fs::write(&path, "xhost all all 1.2.3.4/32 md5\n").unwrap();

    let outcome = ensure_line(&path, "host all all 1.2.3.4/32 md5", "").unwrap();

    assert_eq!(outcome, EnsureOutcome::Appended);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "xhost all all 1.2.3.4/32 md5\nhost all all 1.2.3.4/32 md5\n"
    );
}

#[test]
fn test_missing_trailing_newline_is_repaired() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pg_hba.conf");
    fs::write(&path, "local all all trust").unwrap();

    ensure_line(&path, "host all all 10.0.0.0/8 md5", "").unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "local all all trust\nhost all all 10.0.0.0/8 md5\n"
    );
}

#[test]
fn test_host_rule_for_bare_addresses() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("pg_hba.conf");
    fs::write(&path, "").unwrap();
    let template = RuleTemplate::database_user("app", "app");

    ensure_host_rule(&path, &HbaRule::from_template(true, &template, "192.168.1.10", "md5")).unwrap();
    ensure_host_rule(&path, &HbaRule::from_template(false, &template, "fe80::1", "md5")).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("hostssl \"app\" \"app\" 192.168.1.10/32 md5"));
    assert!(contents.contains("host \"app\" \"app\" fe80::1/128 md5"));
}

#[test]
fn test_cidr_rendering() {
    assert_eq!(format_host("10.0.0.1"), "10.0.0.1/32");
    assert_eq!(format_host("::1"), "::1/128");
    assert_eq!(format_host("10.0.0.0/24"), "10.0.0.0/24");
    assert_eq!(format_host("db.example.com"), "db.example.com");
}

#[test]
fn test_quoted_names_escape_quotes() {
    assert_eq!(escape_hba_string("a\"b"), "\"a\"\"b\"");
    assert_eq!(unescape_hba_string("\"a\"\"b\"").as_deref(), Some("a\"b"));
}

proptest! {
    #[test]
    fn prop_escape_round_trip(name in "[ -~]{0,40}") {
        let escaped = escape_hba_string(&name);
        prop_assert_eq!(unescape_hba_string(&escaped), Some(name));
    }

    #[test]
    fn prop_escaped_name_has_no_lone_quote(name in "[a-z\"]{1,20}") {
        let escaped = escape_hba_string(&name);
        let inner = &escaped[1..escaped.len() - 1];
        prop_assert_eq!(inner.matches('"').count() % 2, 0);
    }
}
