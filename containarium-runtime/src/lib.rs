//! The Runtime Adapter of §4.A: a stable facade over an LXC/Incus-class
//! container runtime, implemented by wrapping its CLI as a subprocess.

pub mod adapter;
pub mod cli;
pub mod error;
pub mod types;

pub use adapter::{locate_binary, RuntimeAdapter};
pub use cli::CliRuntimeAdapter;
pub use error::RuntimeError;
pub use types::{
    CreateSpec, DeviceSize, ExecResult, InstanceConfig, InstanceMetrics, InstanceSummary,
    ServerInfo, SystemResources,
};
