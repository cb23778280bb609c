use std::path::PathBuf;

use clap::Parser;

/// Startup configuration for the sentinel binary (§4.K). Unlike the daemon,
/// the sentinel has no persisted-config layer to merge against — it is a
/// thin, disposable edge process meant to be redeployed, not reconfigured
/// in place.
#[derive(Debug, Clone, Parser)]
#[command(name = "containarium-sentinel", about = "PROXY/MAINTENANCE failover proxy")]
pub struct SentinelConfig {
    /// Base URL of the control-plane API this sentinel fetches certs/target from.
    #[arg(long, env = "SENTINEL_API_BASE_URL")]
    pub api_base_url: String,

    /// Bearer token used to call the control-plane `/certs` endpoint.
    #[arg(long, env = "SENTINEL_API_TOKEN")]
    pub api_token: String,

    /// Host IP that PROXY mode currently DNATs traffic to.
    #[arg(long, env = "SENTINEL_TARGET_IP")]
    pub target_ip: String,

    /// Ports forwarded in PROXY mode, `port/proto` (e.g. `443/tcp`).
    #[arg(long = "forward-port", env = "SENTINEL_FORWARD_PORTS", value_delimiter = ',')]
    pub forward_ports: Vec<String>,

    /// CIDR excluded from DNAT source matching (mirrors the reconciler's
    /// container-CIDR exclusion, §6).
    #[arg(long, env = "SENTINEL_CONTAINER_CIDR", default_value = "10.77.0.0/16")]
    pub container_cidr: String,

    /// Seconds between health probes of the target.
    #[arg(long, env = "SENTINEL_PROBE_INTERVAL_SECS", default_value_t = 5)]
    pub probe_interval_secs: u64,

    /// Consecutive probe failures before PROXY -> MAINTENANCE.
    #[arg(long, env = "SENTINEL_FAILURE_THRESHOLD", default_value_t = 3)]
    pub failure_threshold: u32,

    /// TCP port probed on the target to decide reachability.
    #[arg(long, env = "SENTINEL_PROBE_PORT", default_value_t = 443)]
    pub probe_port: u16,

    /// Address the MAINTENANCE-mode TLS status page listens on.
    #[arg(long, env = "SENTINEL_MAINTENANCE_ADDR", default_value = "0.0.0.0:443")]
    pub maintenance_addr: String,

    /// Address the sentinel's own control/status endpoint listens on.
    #[arg(long, env = "SENTINEL_CONTROL_ADDR", default_value = "127.0.0.1:9400")]
    pub control_addr: String,

    /// Directory certs are cached to after fetching from `/certs`.
    #[arg(long, env = "SENTINEL_CERT_CACHE_DIR", default_value = "/var/lib/containarium-sentinel/certs")]
    pub cert_cache_dir: PathBuf,

    /// Self-signed fallback cert/key, used when no cached cert matches SNI.
    #[arg(long, env = "SENTINEL_FALLBACK_CERT")]
    pub fallback_cert: PathBuf,
    #[arg(long, env = "SENTINEL_FALLBACK_KEY")]
    pub fallback_key: PathBuf,

    #[arg(long, env = "CONTAINARIUM_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "CONTAINARIUM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}
