// src/scanner.rs
//
// TCP connect scanner backing the `network_scan` command. Results are shaped
// as {target: {"tcp": [{port, state, name}]}} so the server can render them
// without knowing which agent produced them.
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::net::TcpStream;

#[derive(Debug, Error, PartialEq)]
pub enum ScanError {
    #[error("invalid port specification: {0}")]
    InvalidPorts(String),

    #[error("cannot resolve target: {0}")]
    InvalidTarget(String),
}

#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, target: &str, ports: &str) -> Result<Value, ScanError>;
}

pub struct TcpConnectScanner {
    connect_timeout: Duration,
}

impl Default for TcpConnectScanner {
    fn default() -> Self {
        TcpConnectScanner {
            connect_timeout: Duration::from_millis(500),
        }
    }
}

/// Expand a port spec such as "1-1024" or "22,80,443" (or a mix of both)
/// into an ordered port list.
fn parse_port_spec(spec: &str) -> Result<Vec<u16>, ScanError> {
    let mut ports = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(ScanError::InvalidPorts(spec.to_string()));
        }
        if let Some((lo, hi)) = part.split_once('-') {
            let lo: u16 = lo
                .trim()
                .parse()
                .map_err(|_| ScanError::InvalidPorts(spec.to_string()))?;
            let hi: u16 = hi
                .trim()
                .parse()
                .map_err(|_| ScanError::InvalidPorts(spec.to_string()))?;
            if lo == 0 || lo > hi {
                return Err(ScanError::InvalidPorts(spec.to_string()));
            }
            ports.extend(lo..=hi);
        } else {
            let port: u16 = part
                .parse()
                .map_err(|_| ScanError::InvalidPorts(spec.to_string()))?;
            if port == 0 {
                return Err(ScanError::InvalidPorts(spec.to_string()));
            }
            ports.push(port);
        }
    }
    Ok(ports)
}

fn service_name(port: u16) -> &'static str {
    match port {
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "domain",
        80 => "http",
        110 => "pop3",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        443 => "https",
        445 => "microsoft-ds",
        1433 => "ms-sql-s",
        3306 => "mysql",
        3389 => "ms-wbt-server",
        5432 => "postgresql",
        5900 => "vnc",
        8080 => "http-proxy",
        _ => "unknown",
    }
}

#[async_trait]
impl Scanner for TcpConnectScanner {
    async fn scan(&self, target: &str, ports: &str) -> Result<Value, ScanError> {
        let port_list = parse_port_spec(ports)?;

        // Resolve once up front so a bad hostname fails the command instead
        // of producing an empty "all closed" result.
        tokio::net::lookup_host((target, 80u16))
            .await
            .map_err(|_| ScanError::InvalidTarget(target.to_string()))?
            .next()
            .ok_or_else(|| ScanError::InvalidTarget(target.to_string()))?;

        let mut open = Vec::new();
        for port in port_list {
            let attempt = tokio::time::timeout(
                self.connect_timeout,
                TcpStream::connect((target, port)),
            )
            .await;
            if let Ok(Ok(_stream)) = attempt {
                debug!("{}:{} open", target, port);
                open.push(json!({
                    "port": port,
                    "state": "open",
                    "name": service_name(port),
                }));
            }
        }

        let mut result = Map::new();
        result.insert(target.to_string(), json!({ "tcp": Value::Array(open) }));
        Ok(Value::Object(result))
    }
}
