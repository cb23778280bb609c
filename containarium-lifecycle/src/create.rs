use std::collections::HashMap;
use std::time::Duration;

use containarium_core::domain::ResourceLimits;

/// Third-party repo / package / post-install commands for a workload
/// stack. The catalog of concrete stacks (e.g. "node", "postgres") is out
/// of scope here — this struct is the already-resolved recipe the caller
/// (API layer) hands down for a given `stack_id`.
#[derive(Debug, Clone, Default)]
pub struct StackSpec {
    pub pre_install_repo_commands: Vec<Vec<String>>,
    pub packages: Vec<String>,
    pub post_install_commands: Vec<Vec<String>>,
}

/// The declarative contract of §4.C.
#[derive(Debug, Clone)]
pub struct CreateContainerRequest {
    pub username: String,
    pub image: String,
    pub limits: ResourceLimits,
    pub static_ip: Option<String>,
    pub ssh_public_keys: Vec<String>,
    pub labels: HashMap<String, String>,
    pub stack: Option<StackSpec>,
    pub nesting: bool,
    pub auto_start: bool,
    pub install_container_runtime: bool,
    pub host_ssh_public_key: String,
    pub network_wait_timeout: Duration,
}

/// Base package set installed unconditionally before any stack-specific
/// packages (§4.C step 5: "an opinionated base set").
pub const BASE_PACKAGES: &[&str] = &["curl", "ca-certificates", "openssh-server", "sudo"];

pub const CONTAINER_RUNTIME_PACKAGES: &[&str] = &["docker.io"];
