// src/dispatcher.rs
//
// Polls the control plane for queued commands and runs them one at a time.
// Every command produces exactly one result post (completed or failed);
// malformed entries are skipped so one bad row cannot wedge the queue.
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde_json::Value;

use crate::models::agent::AgentIdentity;
use crate::models::command::{Command, CommandResult, CommandStatus};
use crate::scanner::Scanner;
use crate::transport::Transport;

const DEFAULT_SCAN_TARGET: &str = "127.0.0.1";
const DEFAULT_SCAN_PORTS: &str = "1-1024";

pub struct CommandDispatcher {
    identity: AgentIdentity,
    transport: Arc<Transport>,
    scanner: Arc<dyn Scanner>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Pick the well-formed commands out of a poll response. The body must be a
/// JSON array; entries that are not objects, or objects that do not decode
/// as a command, are logged and dropped.
pub fn parse_commands(body: &Value) -> Vec<Command> {
    let Some(entries) = body.as_array() else {
        warn!("command poll returned {} instead of an array", json_kind(body));
        return Vec::new();
    };

    let mut commands = Vec::new();
    for entry in entries {
        if !entry.is_object() {
            warn!("skipping non-object command entry ({})", json_kind(entry));
            continue;
        }
        match serde_json::from_value::<Command>(entry.clone()) {
            Ok(command) => commands.push(command),
            Err(e) => warn!("skipping malformed command: {}", e),
        }
    }
    commands
}

impl CommandDispatcher {
    pub fn new(
        identity: AgentIdentity,
        transport: Arc<Transport>,
        scanner: Arc<dyn Scanner>,
    ) -> Self {
        CommandDispatcher {
            identity,
            transport,
            scanner,
        }
    }

    /// One poll cycle: fetch, parse, dispatch sequentially.
    pub async fn poll_once(&self) {
        let body = match self.transport.fetch_commands().await {
            Ok(Some(body)) => body,
            Ok(None) => return,
            Err(e) => {
                warn!("command poll failed: {}", e);
                return;
            }
        };

        for command in parse_commands(&body) {
            self.dispatch(command).await;
        }
    }

    async fn dispatch(&self, command: Command) {
        match command {
            Command::NetworkScan { target, ports } => {
                let target = target.unwrap_or_else(|| DEFAULT_SCAN_TARGET.to_string());
                let ports = ports.unwrap_or_else(|| DEFAULT_SCAN_PORTS.to_string());
                self.run_network_scan(target, ports).await;
            }
            Command::RemoteSession { session_id } => {
                // Session lifecycle rides the channel; the queued command is
                // only the server's announcement.
                info!(
                    "remote session requested (session {})",
                    session_id.as_deref().unwrap_or("unspecified")
                );
            }
            Command::Unknown => warn!("ignoring unrecognized command"),
        }
    }

    async fn run_network_scan(&self, target: String, ports: String) {
        info!("scanning {} ports {}", target, ports);
        let outcome = self.scanner.scan(&target, &ports).await;

        let result = match outcome {
            Ok(findings) => CommandResult {
                agent_id: self.identity.agent_id.clone(),
                command: "network_scan".to_string(),
                status: CommandStatus::Completed,
                target: Some(target),
                ports: Some(ports),
                result: Some(findings),
                error: None,
                timestamp: Utc::now().to_rfc3339(),
            },
            Err(e) => CommandResult {
                agent_id: self.identity.agent_id.clone(),
                command: "network_scan".to_string(),
                status: CommandStatus::Failed,
                target: Some(target),
                ports: Some(ports),
                result: None,
                error: Some(e.to_string()),
                timestamp: Utc::now().to_rfc3339(),
            },
        };

        if let Err(e) = self.transport.post_result(&result).await {
            warn!("failed to post scan result: {}", e);
        }
    }
}
