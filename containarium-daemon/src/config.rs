use std::path::PathBuf;

use clap::Parser;
use containarium_core::domain::DaemonConfigOverrides;

/// Startup configuration for the daemon binary. Unlike the sentinel, most
/// of the control-plane surface (base domain, ports, feature flags) is a
/// persisted-config layer (§4.J); what's here either seeds that layer on
/// first boot, explicitly overrides it per `DaemonConfig::merge`, or
/// configures something that is never persisted at all (credentials, core
/// service images, the datastore connection itself).
#[derive(Debug, Clone, Parser)]
#[command(name = "containarium-daemon", about = "Containarium control-plane daemon")]
pub struct DaemonCliConfig {
    /// Datastore connection string. Defaults to the well-known core
    /// datastore container address (§4.D) if not given.
    #[arg(long, env = "CONTAINARIUM_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "CONTAINARIUM_DATASTORE_IMAGE", default_value = "images:debian/12")]
    pub datastore_image: String,

    #[arg(long, env = "CONTAINARIUM_PROXY_IMAGE", default_value = "images:debian/12")]
    pub proxy_image: String,

    #[arg(long, env = "CONTAINARIUM_DATASTORE_STATIC_IP", default_value = "10.77.0.2")]
    pub datastore_static_ip: String,

    #[arg(long, env = "CONTAINARIUM_PROXY_STATIC_IP", default_value = "10.77.0.3")]
    pub proxy_static_ip: String,

    /// CIDR excluded from passthrough DNAT source matching (§6), the same
    /// exclusion the sentinel mirrors on the edge.
    #[arg(long, env = "CONTAINARIUM_CONTAINER_CIDR", default_value = "10.77.0.0/16")]
    pub container_cidr: String,

    #[arg(long, env = "CONTAINARIUM_PROXY_ADMIN_URL", default_value = "http://10.77.0.3:9500")]
    pub proxy_admin_url: String,

    #[arg(long, env = "CONTAINARIUM_PROXY_SERVER_NAME", default_value = "srv0")]
    pub proxy_server_name: String,

    /// Host public key injected into every new container's
    /// `authorized_keys` so the daemon can reach it over the WS terminal
    /// and account provisioning (§4.A, §4.B).
    #[arg(long, env = "CONTAINARIUM_HOST_SSH_PUBLIC_KEY")]
    pub host_ssh_public_key: String,

    #[arg(long, env = "CONTAINARIUM_JWT_SECRET")]
    pub jwt_secret: String,

    #[arg(long, env = "CONTAINARIUM_MAX_TOKEN_EXPIRY_HOURS")]
    pub max_token_expiry_hours: Option<i64>,

    /// Comma-separated CORS/WebSocket origin allow-list (§4.I).
    #[arg(long, env = "CONTAINARIUM_ALLOWED_ORIGINS", default_value = "")]
    pub allowed_origins: String,

    #[arg(long, env = "CONTAINARIUM_CERTS_DIR", default_value = "/var/lib/containarium/certs")]
    pub certs_dir: PathBuf,

    #[arg(long, env = "CONTAINARIUM_HOME_ROOT", default_value = "/home")]
    pub home_root: PathBuf,

    #[arg(long, env = "CONTAINARIUM_SENTINEL_ACCOUNT", default_value = "containarium-sentinel")]
    pub sentinel_account: String,

    #[arg(long, env = "CONTAINARIUM_HOST_AGENT_UNIT", default_value = "google-guest-agent")]
    pub host_agent_unit: String,

    // --- Persisted DaemonConfig overrides (§4.J): `None` means "operator
    // didn't pass this flag", which is why these are Option<T> rather than
    // clap-defaulted values.
    #[arg(long, env = "CONTAINARIUM_BASE_DOMAIN")]
    pub base_domain: Option<String>,

    #[arg(long, env = "CONTAINARIUM_HTTP_PORT")]
    pub http_port: Option<u16>,

    #[arg(long, env = "CONTAINARIUM_GRPC_PORT")]
    pub grpc_port: Option<u16>,

    #[arg(long, env = "CONTAINARIUM_LISTEN_ADDRESS")]
    pub listen_address: Option<String>,

    #[arg(long, env = "CONTAINARIUM_ENABLE_MTLS")]
    pub enable_mtls: Option<bool>,

    #[arg(long, env = "CONTAINARIUM_ENABLE_REST")]
    pub enable_rest: Option<bool>,

    #[arg(long, env = "CONTAINARIUM_ENABLE_APP_HOSTING")]
    pub enable_app_hosting: Option<bool>,

    #[arg(long, env = "CONTAINARIUM_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "CONTAINARIUM_LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl DaemonCliConfig {
    pub fn database_url_or_default(&self) -> String {
        self.database_url.clone().unwrap_or_else(|| {
            format!("postgres://containarium@{}/containarium", self.datastore_static_ip)
        })
    }

    pub fn overrides(&self) -> DaemonConfigOverrides {
        DaemonConfigOverrides {
            base_domain: self.base_domain.clone(),
            http_port: self.http_port,
            grpc_port: self.grpc_port,
            listen_address: self.listen_address.clone(),
            enable_mtls: self.enable_mtls,
            enable_rest: self.enable_rest,
            enable_app_hosting: self.enable_app_hosting,
        }
    }
}
