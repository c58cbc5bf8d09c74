// src/transport.rs
//
// HTTP side of the control plane. Every call is a single attempt with a
// fixed timeout; failures surface to the caller, which decides whether to
// log-and-skip (steady state) or gate further work (heartbeat).
use std::time::Duration;

use log::warn;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::EndpointConfig;
use crate::models::agent::{FullReportBundle, HeartbeatPayload};
use crate::models::command::CommandResult;

/// Heartbeat and command-poll timeout.
const SHORT_TIMEOUT: Duration = Duration::from_secs(10);
/// Full-report and scan-result timeout; these payloads are bigger.
const LONG_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

pub struct Transport {
    client: Client,
    endpoints: EndpointConfig,
    agent_id: String,
}

impl Transport {
    pub fn new(endpoints: EndpointConfig, agent_id: String) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Transport {
            client,
            endpoints,
            agent_id,
        })
    }

    /// POST the heartbeat. Success is exactly HTTP 200.
    pub async fn post_heartbeat(&self, payload: &HeartbeatPayload) -> Result<(), TransportError> {
        self.post_json(&self.endpoints.heartbeat_url, payload, SHORT_TIMEOUT)
            .await
    }

    /// POST a full report bundle as structured JSON.
    pub async fn post_report(&self, bundle: &FullReportBundle) -> Result<(), TransportError> {
        self.post_json(&self.endpoints.full_report_url, bundle, LONG_TIMEOUT)
            .await
    }

    /// POST one command result, best-effort.
    pub async fn post_result(&self, result: &CommandResult) -> Result<(), TransportError> {
        self.post_json(&self.endpoints.results_url, result, LONG_TIMEOUT)
            .await
    }

    /// GET pending commands. `Ok(None)` means the server answered 200 with
    /// an empty body, i.e. nothing pending this cycle.
    pub async fn fetch_commands(&self) -> Result<Option<Value>, TransportError> {
        let response = self
            .client
            .get(&self.endpoints.commands_url)
            .query(&[("agent_id", self.agent_id.as_str())])
            .timeout(SHORT_TIMEOUT)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(TransportError::Status(response.status().as_u16()));
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Undecodable body counts as "no commands this cycle".
                warn!("commands endpoint returned non-JSON body: {}", e);
                Ok(None)
            }
        }
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        url: &str,
        payload: &T,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .timeout(timeout)
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
