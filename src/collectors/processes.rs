// src/collectors/processes.rs
//
// Top processes by memory use, for the full report's `top_processes` section.
use serde_json::{json, Value};
use sysinfo::System;

use super::CollectorError;

const TOP_N: usize = 15;

pub fn collect() -> Result<Value, CollectorError> {
    let mut sys = System::new_all();
    sys.refresh_all();

    let mut processes: Vec<_> = sys.processes().values().collect();
    processes.sort_by(|a, b| b.memory().cmp(&a.memory()));

    let entries: Vec<Value> = processes
        .iter()
        .take(TOP_N)
        .map(|p| {
            json!({
                "pid": p.pid().as_u32(),
                "name": p.name(),
                "cpu_percent": (p.cpu_usage() * 10.0).round() / 10.0,
                "memory_mb": (p.memory() as f64 / 1_048_576.0 * 10.0).round() / 10.0,
            })
        })
        .collect();

    Ok(Value::Array(entries))
}
