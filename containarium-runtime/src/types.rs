use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use containarium_core::domain::ResourceLimits;

#[derive(Debug, Clone)]
pub struct CreateSpec {
    pub name: String,
    pub image: String,
    pub static_ip: Option<String>,
    pub limits: ResourceLimits,
    pub nesting: bool,
    pub privileged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSize {
    pub disk_bytes: u64,
}

/// Raw config map as the runtime's own CLI reports it — callers that need
/// typed access go through the domain layer instead (§4.A: "get-instance-
/// config (raw config map)").
pub type InstanceConfig = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub kernel: String,
    pub os: String,
}

/// Read from `/proc/loadavg` and friends (§4.A).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SystemResources {
    pub cpu_count: u32,
    pub memory_total_bytes: u64,
    pub memory_available_bytes: u64,
    pub disk_total_bytes: u64,
    pub disk_available_bytes: u64,
    pub load_average_1m: f64,
    pub load_average_5m: f64,
    pub load_average_15m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub name: String,
    pub state: String,
    pub ip_addresses: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstanceMetrics {
    pub cpu_usage_seconds: f64,
    pub memory_usage_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}
