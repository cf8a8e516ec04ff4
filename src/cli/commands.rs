//! CLI command implementations
//!
//! Each command loads the configuration, does one unit of work and returns
//! the JSON `data` of its response. Printing happens once, in `run_command`.

use std::path::Path;

use serde_json::{json, Value};

use crate::access::{AccessSynchronizer, GrantOutcome, LanAccessRequest, PsqlServer};
use crate::engine::{FormationAdded, NodeContext, ReconcileReport, ReconciliationEngine};
use crate::monitor::HttpMonitorClient;
use crate::network::SystemNetworkLocator;
use crate::observability::{log_event, Event, Logger};
use crate::state::NodeState;
use crate::topology::GroupId;

use super::args::{Command, HbaArgs};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = match cmd {
        Command::Reconcile { config, hba } => reconcile(&config, hba),
        Command::EnsureHba { config, hba } => ensure_hba(&config, hba),
        Command::AddFormation {
            config,
            formation,
            group,
        } => add_formation(&config, &formation, group),
        Command::ShowState { config } => show_state(&config),
    };

    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(&e)?;
            Err(e)
        }
    }
}

/// Register or reconcile with the monitor, then grant access
pub fn reconcile(config_path: &Path, hba: HbaArgs) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let mut engine = live_engine(&config, config.node_context(hba)?)?;

    let report = engine.run()?;
    Ok(report_json(&report))
}

/// Grant local network access only; the monitor is not contacted
pub fn ensure_hba(config_path: &Path, hba: HbaArgs) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let context = config.node_context(hba)?;
    let server = PsqlServer::new(&config.psql_path, config.pg_connection.clone());
    let access = AccessSynchronizer::new(SystemNetworkLocator::new());

    let mut grants = Vec::new();
    for template in context.rule_templates() {
        let request = LanAccessRequest {
            ssl: context.ssl,
            template: &template,
            hostname: &context.hostname,
            auth_method: &context.auth_method,
            offline_data_dir: context.offline_data_dir(),
        };
        grants.push(access.grant_local_network_access(&server, &request)?);
    }

    let warnings: Vec<String> = grants.iter().filter_map(GrantOutcome::warning).collect();
    Ok(json!({
        "grants": grants.iter().map(grant_json).collect::<Vec<_>>(),
        "warnings": warnings,
    }))
}

/// Register this node into one more formation
pub fn add_formation(config_path: &Path, formation: &str, group: GroupId) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let mut engine = live_engine(&config, config.node_context(HbaArgs::default())?)?;

    let added = engine.add_formation(formation, group)?;
    Ok(formation_json(&added))
}

/// Print the persisted node state, `null` before the first registration
pub fn show_state(config_path: &Path) -> CliResult<Value> {
    let config = load_config(config_path)?;
    let context = config.node_context(HbaArgs::default())?;

    let state = context.state_store().load()?;
    Ok(match state {
        Some(state) => state_json(&state)?,
        None => Value::Null,
    })
}

fn load_config(path: &Path) -> CliResult<Config> {
    let config = Config::load(path)?;
    Logger::set_min_severity(config.severity()?);
    log_event(
        Event::ConfigLoaded,
        &[
            ("config", &path.display().to_string()),
            ("node_name", &config.node_name),
        ],
    );
    Ok(config)
}

fn live_engine(
    config: &Config,
    context: NodeContext,
) -> CliResult<ReconciliationEngine<HttpMonitorClient, SystemNetworkLocator, PsqlServer>> {
    let monitor = HttpMonitorClient::new(&config.monitor_uri, config.monitor_timeout())?;
    let server = PsqlServer::new(&config.psql_path, config.pg_connection.clone());
    Ok(ReconciliationEngine::new(
        context,
        monitor,
        SystemNetworkLocator::new(),
        server,
    ))
}

/// JSON form of a reconciliation report
pub fn report_json(report: &ReconcileReport) -> Value {
    json!({
        "state": report.state.as_str(),
        "node_id": report.node_id(),
        "node_name": report.node.node_name,
        "formation": report.node.formation,
        "group": report.node.group,
        "registered_now": report.registered_now,
        "state_changed": report.state_changed,
        "grants": report.grants.iter().map(grant_json).collect::<Vec<_>>(),
        "warnings": report.warnings,
    })
}

/// JSON form of one grant
pub fn grant_json(grant: &GrantOutcome) -> Value {
    match grant {
        GrantOutcome::Granted {
            cidr,
            path,
            rule,
            appended,
        } => json!({
            "outcome": "granted",
            "cidr": cidr.to_string(),
            "path": path.display().to_string(),
            "rule": rule,
            "appended": appended,
        }),
        GrantOutcome::Skipped { cidr, path, rule } => json!({
            "outcome": "skipped",
            "cidr": cidr.to_string(),
            "path": path.display().to_string(),
            "rule": rule,
        }),
        GrantOutcome::NoLocalAddress { hostname, reason } => json!({
            "outcome": "no_local_address",
            "hostname": hostname,
            "reason": reason,
        }),
        GrantOutcome::NoLocalNetwork { address, reason } => json!({
            "outcome": "no_local_network",
            "address": address.to_string(),
            "reason": reason,
        }),
    }
}

fn formation_json(added: &FormationAdded) -> Value {
    json!({
        "node_id": added.node_id,
        "formation": added.formation,
        "group": added.group,
        "added": added.added,
    })
}

fn state_json(state: &NodeState) -> CliResult<Value> {
    serde_json::to_value(state).map_err(CliError::from)
}
