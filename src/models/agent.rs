// src/models/agent.rs
use std::collections::BTreeMap;
use std::env;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::System;

/// Who this agent is. Read once at startup, immutable for the process
/// lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub agent_id: String,
    pub hostname: String,
    pub username: String,
    pub os: String,
}

impl AgentIdentity {
    /// Detect hostname/username/OS from the running host. `agent_id` comes
    /// from configuration.
    pub fn detect(agent_id: String) -> Self {
        let hostname = System::host_name().unwrap_or_else(|| "unknown".to_string());
        let username = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => std::env::consts::OS.to_string(),
        };

        AgentIdentity {
            agent_id,
            hostname,
            username,
            os,
        }
    }
}

/// One heartbeat as the control plane expects it. Built fresh each cycle
/// from the latest collector facts; nothing is retained beyond "last sent".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub agent_id: String,
    pub device_name: String,
    pub username: String,
    pub os: String,
    pub edition: String,
    pub cpu: String,
    pub ram: String,
    pub graphics: String,
    pub local_ip: String,
    pub public_ip: String,
    pub location: String,
    /// RFC 3339 collection timestamp.
    pub collected_at: String,
}

/// Aggregate of all collector outputs for one full-report cycle. Written to
/// the report file, POSTed, then dropped.
///
/// A failed sub-collector leaves its section as `None` and records the
/// failure in `collector_errors` keyed by section name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullReportBundle {
    pub hostname: String,
    pub collected_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_info: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_processes: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_apps: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_ports: Option<Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub collector_errors: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_serializes_camel_case() {
        let hb = HeartbeatPayload {
            agent_id: "AGENT001".into(),
            device_name: "host-1".into(),
            username: "alice".into(),
            os: "Linux 6.1".into(),
            edition: "Unknown".into(),
            cpu: "Unknown".into(),
            ram: "8.0 GB".into(),
            graphics: "Unknown".into(),
            local_ip: "10.0.0.2".into(),
            public_ip: "203.0.113.9".into(),
            location: "Unknown".into(),
            collected_at: "2024-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&hb).unwrap();
        assert_eq!(json["agentId"], "AGENT001");
        assert_eq!(json["deviceName"], "host-1");
        assert_eq!(json["localIp"], "10.0.0.2");
        assert_eq!(json["collectedAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn bundle_omits_empty_sections_and_errors() {
        let bundle = FullReportBundle {
            hostname: "host-1".into(),
            collected_at: "2024-01-01T00:00:00Z".into(),
            system_info: Some(serde_json::json!({"os": "Linux"})),
            top_processes: None,
            installed_apps: None,
            security: None,
            open_ports: None,
            collector_errors: BTreeMap::new(),
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("system_info").is_some());
        assert!(json.get("top_processes").is_none());
        assert!(json.get("collector_errors").is_none());
    }

    #[test]
    fn bundle_records_partial_failures() {
        let mut errors = BTreeMap::new();
        errors.insert("installed_apps".to_string(), "unsupported".to_string());
        let bundle = FullReportBundle {
            hostname: "host-1".into(),
            collected_at: "2024-01-01T00:00:00Z".into(),
            system_info: Some(serde_json::json!({})),
            top_processes: Some(serde_json::json!([])),
            installed_apps: None,
            security: None,
            open_ports: None,
            collector_errors: errors,
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["collector_errors"]["installed_apps"], "unsupported");
    }
}
