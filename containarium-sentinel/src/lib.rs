//! Sentinel (§4.K): a small external proxy with PROXY/MAINTENANCE failover,
//! DNAT passthrough in the happy path and self-terminated TLS with a static
//! outage page while the host is unreachable.

pub mod certs;
pub mod config;
pub mod error;
pub mod maintenance;
pub mod passthrough;
pub mod probe;
pub mod state_machine;
pub mod status;

pub use certs::{CachedCert, CertCache};
pub use config::SentinelConfig;
pub use error::SentinelError;
pub use passthrough::{parse_forward_ports, PassthroughForwarder};
pub use state_machine::{Mode, Sentinel, SentinelStatus};
