use std::collections::HashMap;

use containarium_core::domain::{App, AppState, PassthroughRoute, Route};
use serde::{Deserialize, Serialize};

use crate::error::CliError;

/// Thin REST client over `containarium-api`'s surface (§6's CLI contract).
/// Every method maps a non-2xx response onto a [`CliError`] variant so
/// `main` can translate it straight into an exit code.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, CliError> {
        let response = builder.bearer_auth(&self.token).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body: ErrorBody = response
            .json()
            .await
            .unwrap_or_else(|_| ErrorBody {
                error: "unknown".into(),
                message: status.to_string(),
            });
        if status == reqwest::StatusCode::NOT_FOUND {
            Err(CliError::NotFound(body.message))
        } else {
            Err(CliError::Runtime(body.message))
        }
    }

    pub async fn create_container(
        &self,
        body: &CreateContainerBody,
    ) -> Result<CreateContainerReply, CliError> {
        let response = self
            .send(self.http.post(self.url("/containers")).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn list_containers(
        &self,
        username: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<containarium_core::domain::Container>, CliError> {
        let mut request = self.http.get(self.url("/containers"));
        let mut query = Vec::new();
        if let Some(username) = username {
            query.push(("username", username));
        }
        if let Some(state) = state {
            query.push(("state", state));
        }
        request = request.query(&query);
        let response = self.send(request).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_container(&self, name: &str) -> Result<(), CliError> {
        self.send(self.http.delete(self.url(&format!("/containers/{name}"))))
            .await?;
        Ok(())
    }

    pub async fn resize_container(
        &self,
        name: &str,
        limits: containarium_core::domain::ResourceLimits,
    ) -> Result<(), CliError> {
        self.send(
            self.http
                .post(self.url(&format!("/containers/{name}/resize")))
                .json(&serde_json::json!({
                    "cpu_cores": limits.cpu_cores,
                    "memory_bytes": limits.memory_bytes,
                    "disk_bytes": limits.disk_bytes,
                })),
        )
        .await?;
        Ok(())
    }

    pub async fn system_info(&self) -> Result<serde_json::Value, CliError> {
        let response = self.send(self.http.get(self.url("/system/info"))).await?;
        Ok(response.json().await?)
    }

    pub async fn deploy_app(&self, body: &DeployAppBody) -> Result<App, CliError> {
        let response = self.send(self.http.post(self.url("/apps")).json(body)).await?;
        Ok(response.json().await?)
    }

    pub async fn list_apps(&self) -> Result<Vec<App>, CliError> {
        let response = self.send(self.http.get(self.url("/apps"))).await?;
        Ok(response.json().await?)
    }

    pub async fn set_app_state(&self, id: uuid::Uuid, state: AppState) -> Result<(), CliError> {
        let state_str = match state {
            AppState::Deploying => "deploying",
            AppState::Running => "running",
            AppState::Stopped => "stopped",
            AppState::Failed => "failed",
        };
        self.send(
            self.http
                .post(self.url(&format!("/apps/{id}/state")))
                .json(&serde_json::json!({ "state": state_str })),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_app(&self, id: uuid::Uuid) -> Result<(), CliError> {
        self.send(self.http.delete(self.url(&format!("/apps/{id}"))))
            .await?;
        Ok(())
    }

    pub async fn add_passthrough(
        &self,
        body: &AddPassthroughBody,
    ) -> Result<PassthroughRoute, CliError> {
        let response = self
            .send(self.http.post(self.url("/passthrough")).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn list_passthrough(&self) -> Result<Vec<PassthroughRoute>, CliError> {
        let response = self.send(self.http.get(self.url("/passthrough"))).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_passthrough(&self, port: u16, protocol: &str) -> Result<(), CliError> {
        self.send(self.http.delete(self.url(&format!("/passthrough/{port}/{protocol}"))))
            .await?;
        Ok(())
    }

    pub async fn generate_token(
        &self,
        subject: &str,
        expiry_hours: i64,
    ) -> Result<String, CliError> {
        #[derive(Deserialize)]
        struct Reply {
            token: String,
        }
        let response = self
            .send(
                self.http.post(self.url("/tokens")).json(&serde_json::json!({
                    "subject": subject,
                    "expiry_hours": expiry_hours,
                })),
            )
            .await?;
        Ok(response.json::<Reply>().await?.token)
    }

    pub async fn add_collaborator(
        &self,
        body: &AddCollaboratorBody,
    ) -> Result<containarium_core::domain::Collaborator, CliError> {
        let response = self
            .send(self.http.post(self.url("/collaborators")).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn remove_collaborator(&self, id: uuid::Uuid) -> Result<(), CliError> {
        self.send(self.http.delete(self.url(&format!("/collaborators/{id}"))))
            .await?;
        Ok(())
    }

    pub async fn list_collaborators(
        &self,
        container_name: &str,
    ) -> Result<Vec<containarium_core::domain::Collaborator>, CliError> {
        let response = self
            .send(self.http.get(self.url(&format!("/containers/{container_name}/collaborators"))))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn list_routes(&self) -> Result<Vec<Route>, CliError> {
        let response = self.send(self.http.get(self.url("/routes"))).await?;
        Ok(response.json().await?)
    }

    pub async fn list_labels(&self, container_name: &str) -> Result<HashMap<String, String>, CliError> {
        let response = self
            .send(self.http.get(self.url(&format!("/containers/{container_name}/labels"))))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn set_label(&self, container_name: &str, key: &str, value: &str) -> Result<(), CliError> {
        self.send(
            self.http
                .post(self.url(&format!("/containers/{container_name}/labels")))
                .json(&serde_json::json!({ "key": key, "value": value })),
        )
        .await?;
        Ok(())
    }

    pub async fn remove_label(&self, container_name: &str, key: &str) -> Result<(), CliError> {
        self.send(self.http.delete(self.url(&format!(
            "/containers/{container_name}/labels/{key}"
        ))))
        .await?;
        Ok(())
    }

    pub async fn healthz(&self) -> Result<serde_json::Value, CliError> {
        let response = self.http.get(self.url("/healthz")).send().await?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateContainerBody {
    pub username: String,
    pub image: String,
    pub cpu_cores: Option<u32>,
    pub memory_bytes: Option<u64>,
    pub disk_bytes: Option<u64>,
    pub static_ip: Option<String>,
    pub ssh_public_keys: Vec<String>,
    pub labels: HashMap<String, String>,
    #[serde(rename = "async")]
    pub run_async: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateContainerReply {
    pub container_name: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
pub struct DeployAppBody {
    pub name: String,
    pub container_name: String,
    pub image_reference: String,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub struct AddPassthroughBody {
    pub external_port: u16,
    pub protocol: String,
    pub target_ip: String,
    pub target_port: u16,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct AddCollaboratorBody {
    pub container_name: String,
    pub owner_username: String,
    pub collaborator_username: String,
    pub ssh_public_key: String,
    pub has_sudo: bool,
    pub grant_container_runtime: bool,
    pub created_by: String,
}
