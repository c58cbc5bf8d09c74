// src/collectors/ports.rs
//
// Listening TCP ports via the host's own tooling (netstat, falling back to
// ss). Parses the listening lines of either format; the formats are close
// enough that one pass handles both.
use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::CollectorError;

pub fn collect() -> Result<Value, CollectorError> {
    let out = netstat_output()?;
    let ports: Vec<Value> = parse_listening(&out)
        .into_iter()
        .map(|port| json!({ "port": port, "protocol": "tcp", "state": "listening" }))
        .collect();
    Ok(Value::Array(ports))
}

#[cfg(target_os = "windows")]
fn netstat_output() -> Result<String, CollectorError> {
    super::run_command("netstat", &["-an", "-p", "TCP"])
}

#[cfg(not(target_os = "windows"))]
fn netstat_output() -> Result<String, CollectorError> {
    super::run_command("netstat", &["-tln"])
        .or_else(|_| super::run_command("ss", &["-tln"]))
}

/// Pull the local listening ports out of netstat/ss output. Matches lines in
/// any of these shapes:
///   `TCP    0.0.0.0:135   0.0.0.0:0   LISTENING`     (Windows netstat)
///   `tcp    0  0 0.0.0.0:22   0.0.0.0:*   LISTEN`     (Linux netstat)
///   `LISTEN 0  128  0.0.0.0:22   0.0.0.0:*`           (ss)
fn parse_listening(out: &str) -> BTreeSet<u16> {
    let mut ports = BTreeSet::new();
    for line in out.lines() {
        if !line.contains("LISTEN") {
            continue;
        }
        let Some(address) = line.split_whitespace().find(|tok| tok.contains(':')) else {
            continue;
        };
        let Some((_, port)) = address.rsplit_once(':') else {
            continue;
        };
        if let Ok(port) = port.parse::<u16>() {
            ports.insert(port);
        }
    }
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_windows_netstat() {
        let out = "\
Active Connections

  Proto  Local Address          Foreign Address        State
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING
  TCP    0.0.0.0:445            0.0.0.0:0              LISTENING
  TCP    10.0.0.5:51234         142.250.1.1:443        ESTABLISHED
";
        assert_eq!(parse_listening(out), BTreeSet::from([135, 445]));
    }

    #[test]
    fn parses_linux_netstat() {
        let out = "\
Active Internet connections (only servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
tcp        0      0 0.0.0.0:22              0.0.0.0:*               LISTEN
tcp6       0      0 :::80                   :::*                    LISTEN
";
        assert_eq!(parse_listening(out), BTreeSet::from([22, 80]));
    }

    #[test]
    fn parses_ss() {
        let out = "\
State   Recv-Q  Send-Q  Local Address:Port  Peer Address:Port
LISTEN  0       128     0.0.0.0:22          0.0.0.0:*
LISTEN  0       511     127.0.0.1:6379      0.0.0.0:*
";
        assert_eq!(parse_listening(out), BTreeSet::from([22, 6379]));
    }

    #[test]
    fn duplicate_ports_collapse() {
        let out = "\
tcp        0      0 127.0.0.1:8080          0.0.0.0:*               LISTEN
tcp        0      0 10.0.0.5:8080           0.0.0.0:*               LISTEN
";
        assert_eq!(parse_listening(out), BTreeSet::from([8080]));
    }
}
