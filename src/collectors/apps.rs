// src/collectors/apps.rs
//
// Installed application inventory. Backed by dpkg on Debian-family Linux and
// the uninstall registry on Windows; anywhere else the section reports
// unsupported.
use serde_json::{json, Value};

use super::CollectorError;

#[cfg(target_os = "linux")]
pub fn collect() -> Result<Value, CollectorError> {
    let out = super::run_command(
        "dpkg-query",
        &["-W", "-f", "${Package}\\t${Version}\\n"],
    )?;
    Ok(parse_package_lines(&out))
}

#[cfg(target_os = "windows")]
pub fn collect() -> Result<Value, CollectorError> {
    let script = "Get-ItemProperty HKLM:\\Software\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\*, \
                  HKLM:\\Software\\Wow6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\* \
                  | Where-Object DisplayName \
                  | Select-Object DisplayName, DisplayVersion \
                  | ConvertTo-Json -Compress";
    let out = super::run_command("powershell", &["-NoProfile", "-Command", script])?;
    let parsed: Value =
        serde_json::from_str(out.trim()).map_err(|e| CollectorError::Parse(e.to_string()))?;
    // A single match comes back as an object, several as an array.
    let entries = match parsed {
        Value::Array(entries) => entries,
        single @ Value::Object(_) => vec![single],
        _ => return Err(CollectorError::Parse("unexpected registry shape".to_string())),
    };
    let apps: Vec<Value> = entries
        .into_iter()
        .map(|e| {
            json!({
                "name": e["DisplayName"].as_str().unwrap_or("Unknown"),
                "version": e["DisplayVersion"].as_str().unwrap_or(""),
            })
        })
        .collect();
    Ok(Value::Array(apps))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn collect() -> Result<Value, CollectorError> {
    Err(CollectorError::Unsupported)
}

/// Parse `dpkg-query` tab-separated `package\tversion` lines.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_package_lines(out: &str) -> Value {
    let apps: Vec<Value> = out
        .lines()
        .filter_map(|line| {
            let (name, version) = line.split_once('\t')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(json!({ "name": name, "version": version.trim() }))
        })
        .collect();
    Value::Array(apps)
}
