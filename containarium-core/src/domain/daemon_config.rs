use serde::{Deserialize, Serialize};

/// Self-describing config persisted in the datastore (§3, §4.J). Every
/// field is independently overridable by an explicitly-set CLI flag; see
/// `DaemonConfig::merge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub base_domain: String,
    pub http_port: u16,
    pub grpc_port: u16,
    pub listen_address: String,
    pub enable_mtls: bool,
    pub enable_rest: bool,
    pub enable_app_hosting: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            base_domain: "containarium.local".into(),
            http_port: 8080,
            grpc_port: 50051,
            listen_address: "0.0.0.0".into(),
            enable_mtls: false,
            enable_rest: true,
            enable_app_hosting: true,
        }
    }
}

/// CLI-provided overrides. `None` means "operator didn't pass this flag" —
/// the crucial distinction from "operator passed the default value", which
/// is why this isn't just `DaemonConfig` with clap defaults (§4.J).
#[derive(Debug, Clone, Default)]
pub struct DaemonConfigOverrides {
    pub base_domain: Option<String>,
    pub http_port: Option<u16>,
    pub grpc_port: Option<u16>,
    pub listen_address: Option<String>,
    pub enable_mtls: Option<bool>,
    pub enable_rest: Option<bool>,
    pub enable_app_hosting: Option<bool>,
}

impl DaemonConfig {
    /// Persisted config is the base layer; only the fields the operator
    /// explicitly set on the CLI win over it (§4.J, §9).
    pub fn merge(persisted: DaemonConfig, overrides: &DaemonConfigOverrides) -> DaemonConfig {
        DaemonConfig {
            base_domain: overrides
                .base_domain
                .clone()
                .unwrap_or(persisted.base_domain),
            http_port: overrides.http_port.unwrap_or(persisted.http_port),
            grpc_port: overrides.grpc_port.unwrap_or(persisted.grpc_port),
            listen_address: overrides
                .listen_address
                .clone()
                .unwrap_or(persisted.listen_address),
            enable_mtls: overrides.enable_mtls.unwrap_or(persisted.enable_mtls),
            enable_rest: overrides.enable_rest.unwrap_or(persisted.enable_rest),
            enable_app_hosting: overrides
                .enable_app_hosting
                .unwrap_or(persisted.enable_app_hosting),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_overrides_keep_persisted_values() {
        let persisted = DaemonConfig {
            base_domain: "persisted.example".into(),
            ..Default::default()
        };
        let merged = DaemonConfig::merge(persisted.clone(), &DaemonConfigOverrides::default());
        assert_eq!(merged, persisted);
    }

    #[test]
    fn explicit_override_wins_per_field() {
        let persisted = DaemonConfig {
            base_domain: "persisted.example".into(),
            http_port: 9000,
            ..Default::default()
        };
        let overrides = DaemonConfigOverrides {
            http_port: Some(8080),
            ..Default::default()
        };
        let merged = DaemonConfig::merge(persisted, &overrides);
        assert_eq!(merged.base_domain, "persisted.example");
        assert_eq!(merged.http_port, 8080);
    }
}
