// src/config.rs
//
// TOML configuration for the agent. Missing or unreadable configuration is
// the only fatal error class, and only before the loops start.
//
// ```toml
// [general]
// agent_id = "AGENT001"
// heartbeat_interval_secs = 300
// full_report_interval_secs = 3600
// command_poll_interval_secs = 60
// report_filename = "full_system_report.json"
// channel_url = "ws://control.example.net:5000"
//
// [endpoints]
// heartbeat_url = "http://control.example.net:5000/api/agents/{AGENT_ID}/heartbeat"
// full_report_url = "http://control.example.net:5000/api/agents/{AGENT_ID}/report"
// commands_url = "http://control.example.net:5000/api/agents/{AGENT_ID}/commands"
// results_url = "http://control.example.net:5000/api/agents/{AGENT_ID}/results"
// ```
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Placeholder substituted with the configured agent id in every URL.
const AGENT_ID_TEMPLATE: &str = "{AGENT_ID}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub general: GeneralConfig,
    pub endpoints: EndpointConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_full_report_interval")]
    pub full_report_interval_secs: u64,
    #[serde(default = "default_command_poll_interval")]
    pub command_poll_interval_secs: u64,
    #[serde(default = "default_report_filename")]
    pub report_filename: String,
    /// WebSocket URL of the control plane's persistent channel.
    pub channel_url: String,
}

/// The four HTTP endpoints, templated with `{AGENT_ID}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub heartbeat_url: String,
    pub full_report_url: String,
    pub commands_url: String,
    pub results_url: String,
}

fn default_agent_id() -> String {
    "AGENT001".to_string()
}

fn default_heartbeat_interval() -> u64 {
    300
}

fn default_full_report_interval() -> u64 {
    3600
}

fn default_command_poll_interval() -> u64 {
    60
}

fn default_report_filename() -> String {
    "full_system_report.json".to_string()
}

impl AgentConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config: AgentConfig =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.apply_agent_id_template();
        Ok(config)
    }

    /// Substitute `{AGENT_ID}` in every URL with the configured agent id.
    fn apply_agent_id_template(&mut self) {
        let id = self.general.agent_id.clone();
        for url in [
            &mut self.general.channel_url,
            &mut self.endpoints.heartbeat_url,
            &mut self.endpoints.full_report_url,
            &mut self.endpoints.commands_url,
            &mut self.endpoints.results_url,
        ] {
            *url = url.replace(AGENT_ID_TEMPLATE, &id);
        }
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.general.heartbeat_interval_secs)
    }

    pub fn full_report_interval(&self) -> Duration {
        Duration::from_secs(self.general.full_report_interval_secs)
    }

    pub fn command_poll_interval(&self) -> Duration {
        Duration::from_secs(self.general.command_poll_interval_secs)
    }
}
