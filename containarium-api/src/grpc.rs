use containarium_core::domain::{Container, ResourceLimits, Route};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use crate::error::to_tonic_status;
use crate::service::{protocol_from_str, ControlService, CreateContainerParams, ListContainersFilter};

pub mod proto {
    tonic::include_proto!("containarium.control.v1");
}

use proto::control_service_server::ControlService as ControlServiceRpc;
use proto::{
    AddCollaboratorResponse, ContainerSummary, CreateContainerRequest, CreateContainerResponse,
    DeleteRouteRequest, DeleteRouteResponse, GetSystemInfoRequest, GetSystemInfoResponse,
    AddRouteRequest, ListContainersRequest, ListContainersResponse, ListRoutesRequest,
    ListRoutesResponse, RouteReply,
};

/// Thin tonic adapter (§4.H): every RPC here maps request/response types and
/// delegates straight to [`ControlService`] — no business logic lives here.
pub struct GrpcControlService {
    service: std::sync::Arc<ControlService>,
}

impl GrpcControlService {
    pub fn new(service: std::sync::Arc<ControlService>) -> Self {
        GrpcControlService { service }
    }
}

fn container_to_summary(c: Container) -> ContainerSummary {
    ContainerSummary {
        name: c.name,
        owner: c.owner,
        state: format!("{:?}", c.state).to_lowercase(),
        primary_ip: c.primary_ip,
    }
}

fn route_to_reply(r: Route) -> RouteReply {
    RouteReply {
        id: r.id.to_string(),
        full_domain: r.full_domain,
    }
}

#[tonic::async_trait]
impl ControlServiceRpc for GrpcControlService {
    async fn create_container(
        &self,
        request: Request<CreateContainerRequest>,
    ) -> Result<Response<CreateContainerResponse>, Status> {
        let req = request.into_inner();
        let (name, state) = self
            .service
            .create_container(CreateContainerParams {
                username: req.username,
                image: req.image,
                limits: limits_from_proto_fields(req.limits),
                static_ip: req.static_ip,
                ssh_public_keys: req.ssh_public_keys,
                labels: req.labels,
                run_async: req.async_create,
            })
            .await
            .map_err(to_tonic_status)?;
        Ok(Response::new(CreateContainerResponse {
            container_name: name,
            state: format!("{state:?}").to_lowercase(),
        }))
    }

    async fn list_containers(
        &self,
        request: Request<ListContainersRequest>,
    ) -> Result<Response<ListContainersResponse>, Status> {
        let req = request.into_inner();
        let containers = self
            .service
            .list_containers(ListContainersFilter {
                username: req.username,
                state: req.state,
                label_selector: req.label_selector,
            })
            .await
            .map_err(to_tonic_status)?;
        Ok(Response::new(ListContainersResponse {
            containers: containers.into_iter().map(container_to_summary).collect(),
        }))
    }

    async fn get_system_info(
        &self,
        _request: Request<GetSystemInfoRequest>,
    ) -> Result<Response<GetSystemInfoResponse>, Status> {
        let (info, resources) = self.service.system_info().await.map_err(to_tonic_status)?;
        Ok(Response::new(GetSystemInfoResponse {
            runtime_version: info.version,
            kernel: info.kernel,
            os: info.os,
            cpu_count: resources.cpu_count,
            memory_total_bytes: resources.memory_total_bytes,
            disk_total_bytes: resources.disk_total_bytes,
            load_1: resources.load_average_1m,
            load_5: resources.load_average_5m,
            load_15: resources.load_average_15m,
        }))
    }

    async fn add_route(
        &self,
        request: Request<AddRouteRequest>,
    ) -> Result<Response<RouteReply>, Status> {
        let req = request.into_inner();
        let protocol = protocol_from_str(&req.protocol).map_err(to_tonic_status)?;
        let owner_app_id = req
            .owner_app_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| Status::invalid_argument(format!("owner_app_id: {e}")))?;
        let route = Route {
            id: Uuid::new_v4(),
            subdomain: req.subdomain,
            full_domain: req.full_domain,
            target_ip: req.target_ip,
            target_port: req.target_port as u16,
            protocol,
            active: true,
            owner_app_id,
            description: req.description.unwrap_or_default(),
            created_at: chrono::Utc::now(),
            created_by: "grpc".to_string(),
        };
        let route = self.service.add_route(route).await.map_err(to_tonic_status)?;
        Ok(Response::new(route_to_reply(route)))
    }

    async fn delete_route(
        &self,
        request: Request<DeleteRouteRequest>,
    ) -> Result<Response<DeleteRouteResponse>, Status> {
        let id = Uuid::parse_str(&request.into_inner().id)
            .map_err(|e| Status::invalid_argument(format!("id: {e}")))?;
        self.service.delete_route(id).await.map_err(to_tonic_status)?;
        Ok(Response::new(DeleteRouteResponse {}))
    }

    async fn list_routes(
        &self,
        _request: Request<ListRoutesRequest>,
    ) -> Result<Response<ListRoutesResponse>, Status> {
        let routes = self.service.list_routes().await.map_err(to_tonic_status)?;
        Ok(Response::new(ListRoutesResponse {
            routes: routes.into_iter().map(route_to_reply).collect(),
        }))
    }

    async fn add_collaborator(
        &self,
        request: Request<proto::AddCollaboratorRequest>,
    ) -> Result<Response<AddCollaboratorResponse>, Status> {
        let req = request.into_inner();
        let owner_username = Container::owner_from_name(&req.container_name)
            .ok_or_else(|| Status::invalid_argument("container_name is not a user container"))?
            .to_string();
        let collaborator = self
            .service
            .add_collaborator(containarium_lifecycle::AddCollaboratorRequest {
                container_name: req.container_name,
                owner_username,
                collaborator_username: req.collaborator_username,
                ssh_public_key: req.ssh_public_key,
                has_sudo: req.has_sudo,
                grant_container_runtime: req.has_container_runtime,
                created_by: "grpc".to_string(),
            })
            .await
            .map_err(to_tonic_status)?;
        Ok(Response::new(AddCollaboratorResponse {
            account_name: collaborator.account_name,
        }))
    }
}

fn limits_from_proto_fields(limits: Option<proto::ResourceLimits>) -> ResourceLimits {
    match limits {
        Some(l) => ResourceLimits {
            cpu_cores: if l.cpu_cores == 0 { None } else { Some(l.cpu_cores) },
            memory_bytes: if l.memory_bytes == 0 { None } else { Some(l.memory_bytes) },
            disk_bytes: if l.disk_bytes == 0 { None } else { Some(l.disk_bytes) },
        },
        None => ResourceLimits {
            cpu_cores: None,
            memory_bytes: None,
            disk_bytes: None,
        },
    }
}
