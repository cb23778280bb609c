use std::sync::Arc;
use std::time::Duration;

use containarium_core::domain::{Container, ContainerState, ResourceLimits, Role};
use containarium_runtime::{CreateSpec, InstanceSummary, RuntimeAdapter};
use tracing::{info, warn};

use crate::error::LifecycleError;

const DATASTORE_NAME: &str = "_datastore";
const PROXY_NAME: &str = "_reverse-proxy";
const DATASTORE_BOOT_PRIORITY: i32 = 100;
const PROXY_BOOT_PRIORITY: i32 = 90;
const READINESS_RETRIES: u32 = 5;
const READINESS_RETRY_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct CoreServicesSpec {
    pub datastore_image: String,
    pub proxy_image: String,
    pub datastore_static_ip: String,
    pub proxy_static_ip: String,
}

/// §4.D: ensure the datastore and reverse-proxy containers exist, are
/// labelled and boot-prioritised, and are healthy before the daemon loads
/// persisted config.
pub struct CoreServicesBootstrap {
    runtime: Arc<dyn RuntimeAdapter>,
}

impl CoreServicesBootstrap {
    pub fn new(runtime: Arc<dyn RuntimeAdapter>) -> Self {
        CoreServicesBootstrap { runtime }
    }

    /// Returns once both core containers report `Running` and the
    /// datastore has passed its readiness probe.
    pub async fn ensure(&self, spec: &CoreServicesSpec) -> Result<(), LifecycleError> {
        self.ensure_core_container(
            DATASTORE_NAME,
            &spec.datastore_image,
            &spec.datastore_static_ip,
            DATASTORE_BOOT_PRIORITY,
            Role::CoreDatastore,
        )
        .await?;
        self.ensure_core_container(
            PROXY_NAME,
            &spec.proxy_image,
            &spec.proxy_static_ip,
            PROXY_BOOT_PRIORITY,
            Role::CoreProxy,
        )
        .await?;

        self.wait_for_datastore_readiness(&spec.datastore_static_ip).await?;
        Ok(())
    }

    async fn ensure_core_container(
        &self,
        name: &str,
        image: &str,
        static_ip: &str,
        boot_priority: i32,
        role: Role,
    ) -> Result<(), LifecycleError> {
        let existing = self.runtime.list_containers().await?;
        let found = existing.iter().find(|c| c.name == name);

        match found {
            None => {
                info!(name, "core service container missing, creating");
                self.runtime
                    .create(&CreateSpec {
                        name: name.to_string(),
                        image: image.to_string(),
                        static_ip: Some(static_ip.to_string()),
                        limits: ResourceLimits::default(),
                        nesting: false,
                        privileged: false,
                    })
                    .await?;
                self.runtime.start(name).await?;
                self.label_and_prioritize(name, boot_priority, role).await?;
            }
            Some(existing) => {
                // Legacy container pre-dating the label/priority scheme:
                // backfill in place rather than recreating it (§4.D).
                self.backfill_if_needed(existing, boot_priority, role).await?;
                if existing.state != "Running" {
                    self.runtime.start(name).await?;
                }
            }
        }

        self.wait_until_running(name).await
    }

    async fn label_and_prioritize(
        &self,
        name: &str,
        boot_priority: i32,
        role: Role,
    ) -> Result<(), LifecycleError> {
        let mut labels = std::collections::HashMap::new();
        labels.insert("containarium.role/kind".to_string(), role.label_value().to_string());
        self.runtime.apply_labels(name, &labels).await?;
        self.runtime
            .set_config(name, "user.containarium.boot/priority", &boot_priority.to_string())
            .await?;
        Ok(())
    }

    async fn backfill_if_needed(
        &self,
        existing: &InstanceSummary,
        boot_priority: i32,
        role: Role,
    ) -> Result<(), LifecycleError> {
        let config = self.runtime.get_instance_config(&existing.name).await?;
        let has_role_label = config.contains_key("user.containarium.role/kind");
        let has_priority = config.contains_key("user.containarium.boot/priority");
        if !has_role_label || !has_priority {
            warn!(name = %existing.name, "backfilling legacy core service container");
            self.label_and_prioritize(&existing.name, boot_priority, role).await?;
        }
        Ok(())
    }

    async fn wait_until_running(&self, name: &str) -> Result<(), LifecycleError> {
        for _ in 0..READINESS_RETRIES {
            let containers = self.runtime.list_containers().await?;
            if containers.iter().any(|c| c.name == name && c.state == "Running") {
                return Ok(());
            }
            tokio::time::sleep(READINESS_RETRY_INTERVAL).await;
        }
        Err(LifecycleError::Validation(format!(
            "core container '{name}' did not reach Running within the health gate"
        )))
    }

    /// Datastore connection attempts use N retries with a fixed interval
    /// to mask cold-boot races (§4.D).
    async fn wait_for_datastore_readiness(&self, static_ip: &str) -> Result<(), LifecycleError> {
        let database_url = format!("postgres://containarium@{static_ip}/containarium");
        for attempt in 1..=READINESS_RETRIES {
            match containarium_data::connect_and_migrate(&database_url).await {
                Ok(_) => return Ok(()),
                Err(err) if attempt < READINESS_RETRIES => {
                    warn!(attempt, error = %err, "datastore not ready yet, retrying");
                    tokio::time::sleep(READINESS_RETRY_INTERVAL).await;
                }
                Err(err) => {
                    return Err(LifecycleError::Data(err));
                }
            }
        }
        unreachable!("loop always returns on the final attempt")
    }
}

/// Used by the daemon's boot sequence when the API layer needs a plain
/// `Container` snapshot rather than the runtime's raw instance summary.
pub fn core_container_snapshot(name: &str, role: Role, boot_priority: i32) -> Container {
    Container {
        name: name.to_string(),
        owner: "containarium".to_string(),
        state: ContainerState::Running,
        limits: ResourceLimits::default(),
        primary_ip: None,
        labels: std::collections::HashMap::new(),
        role,
        boot_priority,
    }
}
