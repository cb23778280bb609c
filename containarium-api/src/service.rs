use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use containarium_core::domain::{
    App, AppState, Collaborator, Container, ContainerState, HttpProtocol, L4Protocol,
    PassthroughRoute, ResourceLimits, Role, Route,
};
use containarium_core::{ApiError, CancellationToken};
use containarium_data::{AppRepository, CollaboratorRepository, PassthroughRepository, RouteRepository};
use containarium_lifecycle::{
    AddCollaboratorRequest, CollaboratorManager, ContainerLifecycleManager, CreateContainerRequest,
};
use containarium_runtime::{InstanceSummary, RuntimeAdapter};
use tokio::time::sleep;

const CREATE_POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_NETWORK_WAIT: Duration = Duration::from_secs(60);

/// The single authoritative service implementation of §4.H, called by both
/// the REST gateway and the gRPC server. Neither surface touches the
/// lifecycle manager, runtime adapter, or repositories directly.
pub struct ControlService {
    pub(crate) runtime: Arc<dyn RuntimeAdapter>,
    pub(crate) lifecycle: Arc<ContainerLifecycleManager>,
    pub(crate) collaborators: CollaboratorManager,
    pub(crate) routes: RouteRepository,
    pub(crate) apps: AppRepository,
    pub(crate) passthrough: PassthroughRepository,
    pub(crate) host_ssh_public_key: String,
}

#[derive(Debug, Clone)]
pub struct CreateContainerParams {
    pub username: String,
    pub image: String,
    pub limits: ResourceLimits,
    pub static_ip: Option<String>,
    pub ssh_public_keys: Vec<String>,
    pub labels: HashMap<String, String>,
    pub run_async: bool,
}

#[derive(Debug, Clone)]
pub struct ListContainersFilter {
    pub username: Option<String>,
    pub state: Option<String>,
    pub label_selector: HashMap<String, String>,
}

impl ControlService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: Arc<dyn RuntimeAdapter>,
        lifecycle: Arc<ContainerLifecycleManager>,
        collaborators: CollaboratorManager,
        routes: RouteRepository,
        apps: AppRepository,
        passthrough: PassthroughRepository,
        host_ssh_public_key: impl Into<String>,
    ) -> Self {
        ControlService {
            runtime,
            lifecycle,
            collaborators,
            routes,
            apps,
            passthrough,
            host_ssh_public_key: host_ssh_public_key.into(),
        }
    }

    pub fn collaborator_repository(&self) -> &CollaboratorRepository {
        self.collaborators.repository()
    }

    /// §4.H `CreateContainer`: validates, fills defaults, optionally runs
    /// async. Non-async callers block on the declared-state map until the
    /// background create stages finish, rather than polling the runtime.
    pub async fn create_container(
        &self,
        params: CreateContainerParams,
    ) -> Result<(String, ContainerState), ApiError> {
        containarium_core::validation::validate_unix_username(&params.username)
            .map_err(|e| ApiError::validation(e.message().to_string()))?;

        let request = CreateContainerRequest {
            username: params.username.clone(),
            image: params.image,
            limits: params.limits,
            static_ip: params.static_ip,
            ssh_public_keys: params.ssh_public_keys,
            labels: params.labels,
            stack: None,
            nesting: false,
            auto_start: true,
            install_container_runtime: false,
            host_ssh_public_key: self.host_ssh_public_key.clone(),
            network_wait_timeout: DEFAULT_NETWORK_WAIT,
        };

        let name = self
            .lifecycle
            .create_async(request, CancellationToken::new())
            .map_err(|e| ApiError::conflict(e.to_string()))?;

        if !params.run_async {
            loop {
                match self.lifecycle.declared_state(&name) {
                    Some(ContainerState::Creating) => sleep(CREATE_POLL_INTERVAL).await,
                    Some(state) => return Ok((name, state)),
                    None => return Ok((name, ContainerState::Error)),
                }
            }
        }

        Ok((name, ContainerState::Creating))
    }

    /// §4.H `ListContainers`: filters by owner username, state, and label
    /// selector; core-role containers are always excluded from this view.
    pub async fn list_containers(
        &self,
        filter: ListContainersFilter,
    ) -> Result<Vec<Container>, ApiError> {
        let summaries: Vec<InstanceSummary> = self
            .runtime
            .list_containers()
            .await
            .map_err(ApiError::from)?;

        let mut containers = Vec::new();
        for summary in summaries {
            let Some(owner) = Container::owner_from_name(&summary.name) else {
                continue; // core/system container, never listed (§4.H)
            };

            if let Some(ref wanted) = filter.username {
                if owner != wanted {
                    continue;
                }
            }
            if let Some(ref wanted_state) = filter.state {
                if !summary.state.eq_ignore_ascii_case(wanted_state) {
                    continue;
                }
            }

            let declared = self
                .lifecycle
                .declared_state(&summary.name)
                .unwrap_or_else(|| state_from_runtime(&summary.state));

            containers.push(Container {
                name: summary.name,
                owner: owner.to_string(),
                state: declared,
                limits: ResourceLimits::default(),
                primary_ip: summary.ip_addresses.first().cloned(),
                labels: HashMap::new(),
                role: Role::User,
                boot_priority: 0,
            });
        }
        Ok(containers)
    }

    pub async fn resize_container(
        &self,
        name: &str,
        limits: ResourceLimits,
    ) -> Result<(), ApiError> {
        self.lifecycle
            .resize(name, limits)
            .await
            .map_err(ApiError::from)
    }

    pub async fn delete_container(&self, name: &str) -> Result<(), ApiError> {
        // Capture the IP before tearing down — routes are keyed by
        // `target_ip`, which is gone once the container is deleted.
        let target_ip = self
            .runtime
            .list_containers()
            .await
            .map_err(ApiError::from)?
            .into_iter()
            .find(|c| c.name == name)
            .and_then(|c| c.ip_addresses.first().cloned());

        self.lifecycle.delete(name).await.map_err(ApiError::from)?;
        self.collaborators
            .remove_all_for_container(name)
            .await
            .map_err(ApiError::from)?;
        if let Some(ip) = target_ip {
            self.routes.delete_by_target_ip(&ip).await.map_err(ApiError::from)?;
        }
        Ok(())
    }

    /// §4.H `GetSystemInfo`.
    pub async fn system_info(
        &self,
    ) -> Result<(containarium_runtime::ServerInfo, containarium_runtime::SystemResources), ApiError>
    {
        let info = self.runtime.server_info().await.map_err(ApiError::from)?;
        let resources = self
            .runtime
            .system_resources()
            .await
            .map_err(ApiError::from)?;
        Ok((info, resources))
    }

    pub async fn add_route(&self, route: Route) -> Result<Route, ApiError> {
        self.routes.upsert(&route).await.map_err(ApiError::from)?;
        Ok(route)
    }

    pub async fn delete_route(&self, id: uuid::Uuid) -> Result<(), ApiError> {
        self.routes.delete(id).await.map_err(ApiError::from)
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>, ApiError> {
        self.routes.list().await.map_err(ApiError::from)
    }

    pub async fn add_collaborator(
        &self,
        request: AddCollaboratorRequest,
    ) -> Result<Collaborator, ApiError> {
        self.collaborators.add(request).await.map_err(ApiError::from)
    }

    pub async fn remove_collaborator(&self, id: uuid::Uuid) -> Result<(), ApiError> {
        self.collaborators.remove(id).await.map_err(ApiError::from)
    }

    pub async fn list_collaborators(&self, container_name: &str) -> Result<Vec<Collaborator>, ApiError> {
        self.collaborators
            .list_for_container(container_name)
            .await
            .map_err(ApiError::from)
    }

    /// `app deploy` (§6): records the deployment; the image build itself is
    /// out of scope (§1) and assumed already produced by the caller.
    pub async fn deploy_app(&self, app: App) -> Result<App, ApiError> {
        self.apps.create(&app).await.map_err(ApiError::from)?;
        Ok(app)
    }

    pub async fn list_apps(&self) -> Result<Vec<App>, ApiError> {
        self.apps.list().await.map_err(ApiError::from)
    }

    pub async fn get_app(&self, id: uuid::Uuid) -> Result<App, ApiError> {
        self.apps.get(id).await.map_err(ApiError::from)
    }

    pub async fn set_app_state(&self, id: uuid::Uuid, state: AppState) -> Result<(), ApiError> {
        self.apps.set_state(id, state).await.map_err(ApiError::from)
    }

    pub async fn delete_app(&self, id: uuid::Uuid) -> Result<(), ApiError> {
        self.apps.delete(id).await.map_err(ApiError::from)
    }

    pub async fn add_passthrough(&self, route: PassthroughRoute) -> Result<PassthroughRoute, ApiError> {
        self.passthrough.upsert(&route).await.map_err(ApiError::from)?;
        Ok(route)
    }

    pub async fn delete_passthrough(&self, external_port: u16, protocol: L4Protocol) -> Result<(), ApiError> {
        self.passthrough
            .delete(external_port, protocol)
            .await
            .map_err(ApiError::from)
    }

    pub async fn list_passthrough(&self) -> Result<Vec<PassthroughRoute>, ApiError> {
        self.passthrough.list().await.map_err(ApiError::from)
    }

    /// `label set|remove|list` (§6): labels live as `user.{key}` config
    /// entries on the runtime instance, the same storage the boot-priority
    /// bootstrap labels use (§4.D).
    pub async fn list_labels(&self, container_name: &str) -> Result<HashMap<String, String>, ApiError> {
        let config = self
            .runtime
            .get_instance_config(container_name)
            .await
            .map_err(ApiError::from)?;
        Ok(config
            .into_iter()
            .filter_map(|(k, v)| k.strip_prefix("user.").map(|label_key| (label_key.to_string(), v)))
            .collect())
    }

    pub async fn set_label(&self, container_name: &str, key: &str, value: &str) -> Result<(), ApiError> {
        let mut labels = HashMap::new();
        labels.insert(key.to_string(), value.to_string());
        self.runtime
            .apply_labels(container_name, &labels)
            .await
            .map_err(ApiError::from)
    }

    pub async fn remove_label(&self, container_name: &str, key: &str) -> Result<(), ApiError> {
        self.runtime
            .unset_label(container_name, key)
            .await
            .map_err(ApiError::from)
    }
}

pub(crate) fn l4_protocol_from_str(s: &str) -> Result<L4Protocol, ApiError> {
    match s.to_ascii_lowercase().as_str() {
        "tcp" => Ok(L4Protocol::Tcp),
        "udp" => Ok(L4Protocol::Udp),
        other => Err(ApiError::validation(format!("unknown protocol '{other}'"))),
    }
}

fn state_from_runtime(state: &str) -> ContainerState {
    match state.to_ascii_lowercase().as_str() {
        "running" => ContainerState::Running,
        "stopped" => ContainerState::Stopped,
        "frozen" => ContainerState::Frozen,
        _ => ContainerState::Error,
    }
}

pub(crate) fn protocol_from_str(s: &str) -> Result<HttpProtocol, ApiError> {
    match s {
        "http" => Ok(HttpProtocol::Http),
        "grpc" => Ok(HttpProtocol::Grpc),
        other => Err(ApiError::validation(format!("unknown protocol '{other}'"))),
    }
}
