use std::path::Path;
use std::sync::Arc;

use containarium_lifecycle::{CoreServicesBootstrap, CoreServicesSpec};
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::CliError;

/// `recover` (§6, SPEC_FULL.md's supplemented features): re-asserts the core
/// services and forces a config write-back without running the full daemon
/// lifecycle, for operator-driven recovery drills after a partial failure.
#[derive(Debug, Deserialize)]
pub struct RecoveryManifest {
    pub postgres_url: String,
    pub datastore_image: String,
    pub proxy_image: String,
    pub datastore_static_ip: String,
    pub proxy_static_ip: String,
}

pub fn load_manifest(path: &Path) -> Result<RecoveryManifest, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Runtime(format!("reading recovery manifest {}: {e}", path.display())))?;
    toml::from_str(&raw).map_err(|e| CliError::Usage(format!("malformed recovery manifest: {e}")))
}

pub async fn run(manifest: RecoveryManifest) -> Result<(), CliError> {
    let pool = PgPool::connect(&manifest.postgres_url)
        .await
        .map_err(|e| CliError::Runtime(format!("connecting to datastore: {e}")))?;

    let runtime = Arc::new(
        containarium_runtime::CliRuntimeAdapter::discover()
            .map_err(|e| CliError::Runtime(e.to_string()))?,
    );
    let bootstrap = CoreServicesBootstrap::new(runtime);
    bootstrap
        .ensure(&CoreServicesSpec {
            datastore_image: manifest.datastore_image,
            proxy_image: manifest.proxy_image,
            datastore_static_ip: manifest.datastore_static_ip,
            proxy_static_ip: manifest.proxy_static_ip,
        })
        .await
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let config_repo = containarium_data::DaemonConfigRepository::new(pool);
    let config = config_repo
        .load()
        .await
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    config_repo
        .save(&config)
        .await
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    Ok(())
}
