// src/collectors/system.rs
//
// Hardware and network identity facts. Every field degrades to a placeholder
// rather than failing; a machine we can barely read is still worth reporting.
use std::net::UdpSocket;

use log::debug;
use reqwest::Client;
use serde_json::{json, Value};
use sysinfo::{Disks, System};

use super::CollectorError;

/// Static facts about the host hardware and OS.
pub struct SystemFacts {
    pub device_name: String,
    pub os: String,
    pub edition: String,
    pub cpu: String,
    pub ram: String,
    pub graphics: String,
}

impl Default for SystemFacts {
    fn default() -> Self {
        SystemFacts {
            device_name: "Unknown".to_string(),
            os: "Unknown".to_string(),
            edition: "Unknown".to_string(),
            cpu: "Unknown".to_string(),
            ram: "Unknown".to_string(),
            graphics: "Unknown".to_string(),
        }
    }
}

/// Network identity as seen from this host and from the outside.
pub struct NetworkFacts {
    pub local_ip: String,
    pub public_ip: String,
    pub location: String,
}

impl Default for NetworkFacts {
    fn default() -> Self {
        NetworkFacts {
            local_ip: "127.0.0.1".to_string(),
            public_ip: "0.0.0.0".to_string(),
            location: "Unknown".to_string(),
        }
    }
}

fn format_gb(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
}

fn graphics_adapter() -> String {
    #[cfg(target_os = "windows")]
    {
        if let Ok(out) = super::run_command("wmic", &["path", "win32_VideoController", "get", "name"])
        {
            if let Some(name) = out.lines().skip(1).map(str::trim).find(|l| !l.is_empty()) {
                return name.to_string();
            }
        }
    }
    "Unknown".to_string()
}

pub fn system_facts() -> SystemFacts {
    let mut sys = System::new_all();
    sys.refresh_all();

    let cpu = sys
        .cpus()
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    SystemFacts {
        device_name: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        os: match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => "Unknown".to_string(),
        },
        edition: System::long_os_version().unwrap_or_else(|| "Unknown".to_string()),
        cpu,
        ram: format_gb(sys.total_memory()),
        graphics: graphics_adapter(),
    }
}

/// Best local IP guess: the address the OS would route toward a public host.
/// Nothing is actually sent.
fn local_ip() -> String {
    let probe = || -> std::io::Result<String> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip().to_string())
    };
    probe().unwrap_or_else(|_| "127.0.0.1".to_string())
}

pub async fn network_facts(http: &Client) -> NetworkFacts {
    let mut facts = NetworkFacts {
        local_ip: local_ip(),
        ..Default::default()
    };

    let public_ip = match http.get("https://api.ipify.org").send().await {
        Ok(resp) => resp.text().await.ok(),
        Err(e) => {
            debug!("public ip lookup failed: {}", e);
            None
        }
    };
    let Some(public_ip) = public_ip.map(|ip| ip.trim().to_string()).filter(|ip| !ip.is_empty())
    else {
        return facts;
    };

    let geo_url = format!(
        "http://ip-api.com/json/{}?fields=status,city,country",
        public_ip
    );
    facts.public_ip = public_ip;

    match http.get(&geo_url).send().await {
        Ok(resp) => {
            if let Ok(geo) = resp.json::<Value>().await {
                if geo["status"] == "success" {
                    let city = geo["city"].as_str().unwrap_or("");
                    let country = geo["country"].as_str().unwrap_or("");
                    if !city.is_empty() || !country.is_empty() {
                        facts.location = [city, country]
                            .iter()
                            .filter(|s| !s.is_empty())
                            .cloned()
                            .collect::<Vec<_>>()
                            .join(", ");
                    }
                }
            }
        }
        Err(e) => debug!("geolocation lookup failed: {}", e),
    }

    facts
}

/// The `system_info` section of the full report.
pub fn collect(network: &NetworkFacts) -> Result<Value, CollectorError> {
    let facts = system_facts();

    let disks = Disks::new_with_refreshed_list();
    let disk_entries: Vec<Value> = disks
        .iter()
        .map(|disk| {
            json!({
                "mount": disk.mount_point().to_string_lossy(),
                "total": format_gb(disk.total_space()),
                "available": format_gb(disk.available_space()),
            })
        })
        .collect();

    Ok(json!({
        "deviceName": facts.device_name,
        "os": facts.os,
        "edition": facts.edition,
        "cpu": facts.cpu,
        "ram": facts.ram,
        "graphics": facts.graphics,
        "network": {
            "localIp": network.local_ip,
            "publicIp": network.public_ip,
            "location": network.location,
        },
        "disks": disk_entries,
    }))
}
