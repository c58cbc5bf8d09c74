// src/collectors/mod.rs
//
// Host telemetry collectors. Each sub-collector is independent: a failure is
// recorded per section and never blocks the others, so the report that goes
// out is always the best picture available.
pub mod apps;
pub mod ports;
pub mod processes;
pub mod security;
pub mod system;

use std::collections::BTreeMap;
use std::process::Command;
use std::time::Duration;

use chrono::Utc;
use log::warn;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use crate::models::agent::{AgentIdentity, FullReportBundle, HeartbeatPayload};
use system::NetworkFacts;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("command failed: {0}")]
    Command(String),

    #[error("output parse failed: {0}")]
    Parse(String),

    #[error("not supported on this platform")]
    Unsupported,
}

/// Run a host command and return its stdout, treating a non-zero exit as a
/// failure.
pub(crate) fn run_command(program: &str, args: &[&str]) -> Result<String, CollectorError> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CollectorError::Command(format!("{}: {}", program, e)))?;
    if !output.status.success() {
        return Err(CollectorError::Command(format!(
            "{} exited with {}",
            program, output.status
        )));
    }
    String::from_utf8(output.stdout)
        .map_err(|e| CollectorError::Parse(format!("{}: {}", program, e)))
}

/// Fold one section result into the bundle: the value on success, an error
/// record on failure.
fn record(
    name: &str,
    result: Result<Value, CollectorError>,
    errors: &mut BTreeMap<String, String>,
) -> Option<Value> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("collector '{}' failed: {}", name, e);
            errors.insert(name.to_string(), e.to_string());
            None
        }
    }
}

pub struct CollectorSet {
    http: Client,
}

impl CollectorSet {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(5)).build()?;
        Ok(CollectorSet { http })
    }

    /// The light per-heartbeat snapshot: basic hardware facts plus network
    /// identity, collected fresh each cycle.
    pub async fn build_heartbeat(&self, identity: &AgentIdentity) -> HeartbeatPayload {
        let facts = tokio::task::spawn_blocking(system::system_facts)
            .await
            .unwrap_or_default();
        let network = system::network_facts(&self.http).await;

        HeartbeatPayload {
            agent_id: identity.agent_id.clone(),
            device_name: facts.device_name,
            username: identity.username.clone(),
            os: facts.os,
            edition: facts.edition,
            cpu: facts.cpu,
            ram: facts.ram,
            graphics: facts.graphics,
            local_ip: network.local_ip,
            public_ip: network.public_ip,
            location: network.location,
            collected_at: Utc::now().to_rfc3339(),
        }
    }

    /// The heavy full-report pass. Blocking collectors run off the async
    /// runtime; each section fails independently.
    pub async fn collect_full(&self, identity: &AgentIdentity) -> FullReportBundle {
        let network = system::network_facts(&self.http).await;
        let hostname = identity.hostname.clone();
        tokio::task::spawn_blocking(move || collect_blocking(hostname, network))
            .await
            .unwrap_or_else(|e| {
                let mut errors = BTreeMap::new();
                errors.insert("collectors".to_string(), e.to_string());
                FullReportBundle {
                    hostname: String::new(),
                    collected_at: Utc::now().to_rfc3339(),
                    system_info: None,
                    top_processes: None,
                    installed_apps: None,
                    security: None,
                    open_ports: None,
                    collector_errors: errors,
                }
            })
    }
}

fn collect_blocking(hostname: String, network: NetworkFacts) -> FullReportBundle {
    let mut errors = BTreeMap::new();
    let system_info = record("system_info", system::collect(&network), &mut errors);
    let top_processes = record("top_processes", processes::collect(), &mut errors);
    let installed_apps = record("installed_apps", apps::collect(), &mut errors);
    let security = record("security", security::collect(), &mut errors);
    let open_ports = record("open_ports", ports::collect(), &mut errors);

    FullReportBundle {
        hostname,
        collected_at: Utc::now().to_rfc3339(),
        system_info,
        top_processes,
        installed_apps,
        security,
        open_ports,
        collector_errors: errors,
    }
}
