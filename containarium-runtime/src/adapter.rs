use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::types::{
    CreateSpec, DeviceSize, ExecResult, InstanceConfig, InstanceMetrics, InstanceSummary,
    ServerInfo, SystemResources,
};

/// The stable facade of §4.A. One instance drives one LXC/Incus-class
/// runtime; every operation is synchronous from the caller's point of
/// view — `wait_for_network` is the only one that internally polls.
#[async_trait]
pub trait RuntimeAdapter: Send + Sync {
    async fn create(&self, spec: &CreateSpec) -> Result<(), RuntimeError>;
    async fn start(&self, name: &str) -> Result<(), RuntimeError>;
    async fn stop(&self, name: &str, force: bool) -> Result<(), RuntimeError>;
    async fn delete(&self, name: &str) -> Result<(), RuntimeError>;
    async fn wait_for_network(&self, name: &str, timeout: Duration) -> Result<(), RuntimeError>;
    async fn exec(&self, name: &str, argv: &[String]) -> Result<ExecResult, RuntimeError>;
    async fn file_push(
        &self,
        name: &str,
        path: &str,
        bytes: &[u8],
        mode: u32,
    ) -> Result<(), RuntimeError>;
    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError>;
    async fn get_instance_config(&self, name: &str) -> Result<InstanceConfig, RuntimeError>;
    async fn set_config(&self, name: &str, key: &str, value: &str) -> Result<(), RuntimeError>;
    async fn set_device_size(&self, name: &str, size: DeviceSize) -> Result<(), RuntimeError>;
    async fn apply_labels(
        &self,
        name: &str,
        labels: &std::collections::HashMap<String, String>,
    ) -> Result<(), RuntimeError>;
    async fn unset_label(&self, name: &str, key: &str) -> Result<(), RuntimeError>;
    async fn attach_acl(&self, name: &str, acl_name: &str) -> Result<(), RuntimeError>;
    async fn detach_acl(&self, name: &str, acl_name: &str) -> Result<(), RuntimeError>;
    async fn server_info(&self) -> Result<ServerInfo, RuntimeError>;
    async fn system_resources(&self) -> Result<SystemResources, RuntimeError>;
    async fn list_containers(&self) -> Result<Vec<InstanceSummary>, RuntimeError>;
    async fn stream_metrics(&self, name: &str) -> Result<InstanceMetrics, RuntimeError>;
}

/// Where we look for a usable container-runtime binary, in preference
/// order. Incus is the actively-maintained LXC fork; `lxc` is kept for
/// hosts that still run the upstream client.
const CANDIDATE_BINARIES: &[&str] = &["incus", "lxc"];

pub fn locate_binary() -> Result<std::path::PathBuf, RuntimeError> {
    let mut last_err = None;
    for candidate in CANDIDATE_BINARIES {
        match which::which(candidate) {
            Ok(path) => return Ok(path),
            Err(err) => last_err = Some(err),
        }
    }
    Err(RuntimeError::BinaryNotFound(
        last_err.expect("CANDIDATE_BINARIES is non-empty"),
    ))
}

pub fn binary_subcommand_for(path: &Path) -> &'static str {
    match path.file_name().and_then(|n| n.to_str()) {
        Some("incus") => "incus",
        _ => "lxc",
    }
}
