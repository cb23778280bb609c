use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use containarium_core::domain::{App, AppState, L4Protocol, PassthroughRoute, Route};
use containarium_lifecycle::AddCollaboratorRequest;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::require_bearer_token;
use crate::certs::list_certificates;
use crate::error::ApiErrorResponse;
use crate::keys::{add_authorized_key, authorized_keys_path, list_authorized_keys};
use crate::service::{CreateContainerParams, ListContainersFilter};
use crate::state::ApiState;
use crate::{sse, ws};

pub fn router(state: ApiState) -> Router {
    let cors_origins: Vec<http::HeaderValue> = state
        .origins
        .as_header_values()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let protected = Router::new()
        .route("/containers", post(create_container).get(list_containers))
        .route("/containers/{name}", delete(delete_container))
        .route("/containers/{name}/resize", post(resize_container))
        .route("/system/info", get(system_info))
        .route("/routes", post(add_route).get(list_routes))
        .route("/routes/{id}", delete(delete_route))
        .route("/collaborators", post(add_collaborator))
        .route("/collaborators/{id}", delete(remove_collaborator))
        .route("/containers/{name}/collaborators", get(list_collaborators))
        .route("/apps", post(deploy_app).get(list_apps))
        .route("/apps/{id}", get(get_app).delete(delete_app))
        .route("/apps/{id}/state", post(set_app_state))
        .route("/passthrough", post(add_passthrough).get(list_passthrough))
        .route("/passthrough/{port}/{protocol}", delete(delete_passthrough))
        .route("/containers/{name}/labels", get(list_labels).post(set_label))
        .route("/containers/{name}/labels/{key}", delete(remove_label))
        .route("/tokens", post(generate_token))
        .route("/certs", get(get_certs))
        .route("/authorized-keys", get(get_authorized_keys).post(post_authorized_key))
        .route(
            "/authorized-keys/sentinel",
            get(get_sentinel_authorized_keys).post(post_sentinel_authorized_key),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_token,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/events", get(sse::stream_events))
        .route("/ws/terminal/{container}", get(ws::terminal))
        .merge(protected)
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    datastore: &'static str,
    reconciler_last_tick_age_secs: i64,
}

async fn healthz(State(state): State<ApiState>) -> Json<HealthBody> {
    let datastore = match tokio::time::timeout(
        Duration::from_secs(2),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => "reachable",
        _ => "unreachable",
    };
    let age = Utc::now().timestamp() - state.reconciler_last_tick.load(Ordering::Relaxed);
    Json(HealthBody {
        status: if datastore == "reachable" { "ok" } else { "degraded" },
        datastore,
        reconciler_last_tick_age_secs: age,
    })
}

#[derive(Debug, Deserialize)]
struct CreateContainerBody {
    username: String,
    #[serde(default = "default_image")]
    image: String,
    #[serde(default)]
    cpu_cores: Option<u32>,
    #[serde(default)]
    memory_bytes: Option<u64>,
    #[serde(default)]
    disk_bytes: Option<u64>,
    #[serde(default)]
    static_ip: Option<String>,
    #[serde(default)]
    ssh_public_keys: Vec<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
    #[serde(default)]
    r#async: bool,
}

fn default_image() -> String {
    "ubuntu:24.04".to_string()
}

#[derive(Debug, Serialize)]
struct CreateContainerReply {
    container_name: String,
    state: String,
}

async fn create_container(
    State(state): State<ApiState>,
    Json(body): Json<CreateContainerBody>,
) -> Result<Json<CreateContainerReply>, ApiErrorResponse> {
    let (name, container_state) = state
        .service
        .create_container(CreateContainerParams {
            username: body.username,
            image: body.image,
            limits: containarium_core::domain::ResourceLimits {
                cpu_cores: body.cpu_cores,
                memory_bytes: body.memory_bytes,
                disk_bytes: body.disk_bytes,
            },
            static_ip: body.static_ip,
            ssh_public_keys: body.ssh_public_keys,
            labels: body.labels,
            run_async: body.r#async,
        })
        .await?;
    Ok(Json(CreateContainerReply {
        container_name: name,
        state: format!("{container_state:?}").to_lowercase(),
    }))
}

#[derive(Debug, Deserialize)]
struct ListContainersQuery {
    username: Option<String>,
    state: Option<String>,
}

async fn list_containers(
    State(state): State<ApiState>,
    Query(query): Query<ListContainersQuery>,
) -> Result<Json<Vec<containarium_core::domain::Container>>, ApiErrorResponse> {
    let containers = state
        .service
        .list_containers(ListContainersFilter {
            username: query.username,
            state: query.state,
            label_selector: HashMap::new(),
        })
        .await?;
    Ok(Json(containers))
}

async fn delete_container(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<(), ApiErrorResponse> {
    state.service.delete_container(&name).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ResizeBody {
    cpu_cores: Option<u32>,
    memory_bytes: Option<u64>,
    disk_bytes: Option<u64>,
}

async fn resize_container(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(body): Json<ResizeBody>,
) -> Result<(), ApiErrorResponse> {
    state
        .service
        .resize_container(
            &name,
            containarium_core::domain::ResourceLimits {
                cpu_cores: body.cpu_cores,
                memory_bytes: body.memory_bytes,
                disk_bytes: body.disk_bytes,
            },
        )
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SystemInfoReply {
    runtime_version: String,
    kernel: String,
    os: String,
    cpu_count: u32,
    memory_total_bytes: u64,
    disk_total_bytes: u64,
    load_average_1m: f64,
    load_average_5m: f64,
    load_average_15m: f64,
}

async fn system_info(State(state): State<ApiState>) -> Result<Json<SystemInfoReply>, ApiErrorResponse> {
    let (info, resources) = state.service.system_info().await?;
    Ok(Json(SystemInfoReply {
        runtime_version: info.version,
        kernel: info.kernel,
        os: info.os,
        cpu_count: resources.cpu_count,
        memory_total_bytes: resources.memory_total_bytes,
        disk_total_bytes: resources.disk_total_bytes,
        load_average_1m: resources.load_average_1m,
        load_average_5m: resources.load_average_5m,
        load_average_15m: resources.load_average_15m,
    }))
}

#[derive(Debug, Deserialize)]
struct AddRouteBody {
    subdomain: String,
    full_domain: String,
    target_ip: String,
    target_port: u16,
    #[serde(default = "default_protocol")]
    protocol: String,
    owner_app_id: Option<Uuid>,
    #[serde(default)]
    description: String,
    created_by: String,
}

fn default_protocol() -> String {
    "http".to_string()
}

async fn add_route(
    State(state): State<ApiState>,
    Json(body): Json<AddRouteBody>,
) -> Result<Json<Route>, ApiErrorResponse> {
    let protocol = crate::service::protocol_from_str(&body.protocol)?;
    let route = Route {
        id: Uuid::new_v4(),
        subdomain: body.subdomain,
        full_domain: body.full_domain,
        target_ip: body.target_ip,
        target_port: body.target_port,
        protocol,
        active: true,
        owner_app_id: body.owner_app_id,
        description: body.description,
        created_at: Utc::now(),
        created_by: body.created_by,
    };
    let route = state.service.add_route(route).await?;
    Ok(Json(route))
}

async fn delete_route(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<(), ApiErrorResponse> {
    state.service.delete_route(id).await?;
    Ok(())
}

async fn list_routes(State(state): State<ApiState>) -> Result<Json<Vec<Route>>, ApiErrorResponse> {
    Ok(Json(state.service.list_routes().await?))
}

#[derive(Debug, Deserialize)]
struct AddCollaboratorBody {
    container_name: String,
    owner_username: String,
    collaborator_username: String,
    ssh_public_key: String,
    #[serde(default)]
    has_sudo: bool,
    #[serde(default)]
    grant_container_runtime: bool,
    created_by: String,
}

async fn add_collaborator(
    State(state): State<ApiState>,
    Json(body): Json<AddCollaboratorBody>,
) -> Result<Json<containarium_core::domain::Collaborator>, ApiErrorResponse> {
    let collaborator = state
        .service
        .add_collaborator(AddCollaboratorRequest {
            container_name: body.container_name,
            owner_username: body.owner_username,
            collaborator_username: body.collaborator_username,
            ssh_public_key: body.ssh_public_key,
            has_sudo: body.has_sudo,
            grant_container_runtime: body.grant_container_runtime,
            created_by: body.created_by,
        })
        .await?;
    Ok(Json(collaborator))
}

async fn remove_collaborator(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<(), ApiErrorResponse> {
    state.service.remove_collaborator(id).await?;
    Ok(())
}

async fn list_collaborators(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<containarium_core::domain::Collaborator>>, ApiErrorResponse> {
    Ok(Json(state.service.list_collaborators(&name).await?))
}

#[derive(Debug, Deserialize)]
struct DeployAppBody {
    name: String,
    container_name: String,
    image_reference: String,
    created_by: String,
}

async fn deploy_app(
    State(state): State<ApiState>,
    Json(body): Json<DeployAppBody>,
) -> Result<Json<App>, ApiErrorResponse> {
    let app = App {
        id: Uuid::new_v4(),
        name: body.name,
        container_name: body.container_name,
        state: AppState::Deploying,
        image_reference: body.image_reference,
        created_at: Utc::now(),
        created_by: body.created_by,
    };
    Ok(Json(state.service.deploy_app(app).await?))
}

async fn list_apps(State(state): State<ApiState>) -> Result<Json<Vec<App>>, ApiErrorResponse> {
    Ok(Json(state.service.list_apps().await?))
}

async fn get_app(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<App>, ApiErrorResponse> {
    Ok(Json(state.service.get_app(id).await?))
}

async fn delete_app(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<(), ApiErrorResponse> {
    state.service.delete_app(id).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SetAppStateBody {
    state: String,
}

async fn set_app_state(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetAppStateBody>,
) -> Result<(), ApiErrorResponse> {
    let target = match body.state.as_str() {
        "running" => AppState::Running,
        "stopped" => AppState::Stopped,
        "failed" => AppState::Failed,
        "deploying" => AppState::Deploying,
        other => {
            return Err(crate::error::ApiErrorResponse(
                containarium_core::ApiError::validation(format!("unknown app state '{other}'")),
            ))
        }
    };
    state.service.set_app_state(id, target).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AddPassthroughBody {
    external_port: u16,
    protocol: String,
    target_ip: String,
    target_port: u16,
    #[serde(default)]
    description: String,
}

async fn add_passthrough(
    State(state): State<ApiState>,
    Json(body): Json<AddPassthroughBody>,
) -> Result<Json<PassthroughRoute>, ApiErrorResponse> {
    let protocol = crate::service::l4_protocol_from_str(&body.protocol)?;
    let route = PassthroughRoute {
        external_port: body.external_port,
        target_ip: body.target_ip,
        target_port: body.target_port,
        protocol,
        description: body.description,
    };
    Ok(Json(state.service.add_passthrough(route).await?))
}

async fn list_passthrough(
    State(state): State<ApiState>,
) -> Result<Json<Vec<PassthroughRoute>>, ApiErrorResponse> {
    Ok(Json(state.service.list_passthrough().await?))
}

async fn delete_passthrough(
    State(state): State<ApiState>,
    Path((port, protocol)): Path<(u16, String)>,
) -> Result<(), ApiErrorResponse> {
    let protocol = crate::service::l4_protocol_from_str(&protocol)?;
    state.service.delete_passthrough(port, protocol).await?;
    Ok(())
}

async fn list_labels(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<HashMap<String, String>>, ApiErrorResponse> {
    Ok(Json(state.service.list_labels(&name).await?))
}

#[derive(Debug, Deserialize)]
struct SetLabelBody {
    key: String,
    value: String,
}

async fn set_label(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(body): Json<SetLabelBody>,
) -> Result<(), ApiErrorResponse> {
    state.service.set_label(&name, &body.key, &body.value).await?;
    Ok(())
}

async fn remove_label(
    State(state): State<ApiState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<(), ApiErrorResponse> {
    state.service.remove_label(&name, &key).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct GenerateTokenBody {
    subject: String,
    expiry_hours: i64,
}

#[derive(Debug, Serialize)]
struct GenerateTokenReply {
    token: String,
}

/// `token generate` (§6): mints a bearer token under the §4.I expiry cap.
/// Minting requires an already-valid token (this route sits behind
/// `require_bearer_token` like every other protected route) — there is no
/// unauthenticated bootstrap path.
async fn generate_token(
    State(state): State<ApiState>,
    Json(body): Json<GenerateTokenBody>,
) -> Result<Json<GenerateTokenReply>, ApiErrorResponse> {
    let token = state
        .jwt
        .issue(&body.subject, body.expiry_hours)
        .map_err(containarium_core::ApiError::from)?;
    Ok(Json(GenerateTokenReply { token }))
}

async fn get_certs(
    State(state): State<ApiState>,
) -> Result<Json<Vec<containarium_core::domain::CertificatePair>>, ApiErrorResponse> {
    Ok(Json(list_certificates(&state.certs_dir).await?))
}

#[derive(Debug, Deserialize)]
struct AuthorizedKeysQuery {
    account: String,
}

#[derive(Debug, Serialize)]
struct AuthorizedKeysReply {
    keys: Vec<String>,
}

async fn get_authorized_keys(
    State(state): State<ApiState>,
    Query(query): Query<AuthorizedKeysQuery>,
) -> Result<Json<AuthorizedKeysReply>, ApiErrorResponse> {
    let path = authorized_keys_path(&state.home_root, &query.account);
    Ok(Json(AuthorizedKeysReply {
        keys: list_authorized_keys(&path).await?,
    }))
}

#[derive(Debug, Deserialize)]
struct AddKeyBody {
    public_key: String,
}

#[derive(Debug, Serialize)]
struct AddKeyReply {
    added: bool,
}

async fn post_authorized_key(
    State(state): State<ApiState>,
    Query(query): Query<AuthorizedKeysQuery>,
    Json(body): Json<AddKeyBody>,
) -> Result<Json<AddKeyReply>, ApiErrorResponse> {
    let path = authorized_keys_path(&state.home_root, &query.account);
    let added = add_authorized_key(&path, &body.public_key).await?;
    Ok(Json(AddKeyReply { added }))
}

async fn get_sentinel_authorized_keys(
    State(state): State<ApiState>,
) -> Result<Json<AuthorizedKeysReply>, ApiErrorResponse> {
    let path = authorized_keys_path(&state.home_root, &state.sentinel_account);
    Ok(Json(AuthorizedKeysReply {
        keys: list_authorized_keys(&path).await?,
    }))
}

async fn post_sentinel_authorized_key(
    State(state): State<ApiState>,
    Json(body): Json<AddKeyBody>,
) -> Result<Json<AddKeyReply>, ApiErrorResponse> {
    let path = authorized_keys_path(&state.home_root, &state.sentinel_account);
    let added = add_authorized_key(&path, &body.public_key).await?;
    Ok(Json(AddKeyReply { added }))
}
