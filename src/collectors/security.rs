// src/collectors/security.rs
//
// Security posture: antivirus and firewall state. Windows-only; other
// platforms report the section as unsupported rather than guessing.
use serde_json::Value;

use super::CollectorError;

#[cfg(target_os = "windows")]
pub fn collect() -> Result<Value, CollectorError> {
    use serde_json::json;

    let av_script = "Get-MpComputerStatus \
                     | Select-Object AntivirusEnabled, RealTimeProtectionEnabled, \
                       AntivirusSignatureLastUpdated \
                     | ConvertTo-Json -Compress";
    let antivirus = super::run_command("powershell", &["-NoProfile", "-Command", av_script])
        .ok()
        .and_then(|out| serde_json::from_str::<Value>(out.trim()).ok())
        .unwrap_or(Value::Null);

    let fw_out = super::run_command("netsh", &["advfirewall", "show", "allprofiles", "state"])?;
    let firewall = parse_firewall_profiles(&fw_out);

    Ok(json!({
        "antivirus": antivirus,
        "firewall": firewall,
    }))
}

#[cfg(not(target_os = "windows"))]
pub fn collect() -> Result<Value, CollectorError> {
    Err(CollectorError::Unsupported)
}

/// Parse `netsh advfirewall show allprofiles state` output into a
/// profile-to-state map.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn parse_firewall_profiles(out: &str) -> Value {
    let mut profiles = serde_json::Map::new();
    let mut current: Option<String> = None;
    for line in out.lines() {
        let line = line.trim();
        if let Some(name) = line.strip_suffix("Profile Settings:") {
            current = Some(name.trim().to_lowercase());
        } else if let Some(state) = line.strip_prefix("State") {
            if let Some(profile) = current.take() {
                profiles.insert(profile, Value::String(state.trim().to_string()));
            }
        }
    }
    Value::Object(profiles)
}
