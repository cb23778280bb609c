use std::sync::Arc;

use chrono::Utc;
use containarium_accounts::HostAccountManager;
use containarium_core::domain::Collaborator;
use containarium_core::validation::validate_unix_username;
use containarium_data::CollaboratorRepository;
use containarium_runtime::RuntimeAdapter;

use crate::error::LifecycleError;

const CONTAINER_RUNTIME_GROUPS: &[&str] = &["docker", "podman"];

#[derive(Debug, Clone)]
pub struct AddCollaboratorRequest {
    pub container_name: String,
    pub owner_username: String,
    pub collaborator_username: String,
    pub ssh_public_key: String,
    pub has_sudo: bool,
    pub grant_container_runtime: bool,
    pub created_by: String,
}

/// Implements §4.L: an in-container user, a sudoers drop-in, session I/O
/// logging, an SSH key, and a jump-server account (via B) per added
/// collaborator.
pub struct CollaboratorManager {
    runtime: Arc<dyn RuntimeAdapter>,
    accounts: Arc<HostAccountManager>,
    repository: CollaboratorRepository,
}

impl CollaboratorManager {
    pub fn new(
        runtime: Arc<dyn RuntimeAdapter>,
        accounts: Arc<HostAccountManager>,
        repository: CollaboratorRepository,
    ) -> Self {
        CollaboratorManager {
            runtime,
            accounts,
            repository,
        }
    }

    pub async fn add(&self, request: AddCollaboratorRequest) -> Result<Collaborator, LifecycleError> {
        validate_unix_username(&request.collaborator_username)
            .map_err(|e| LifecycleError::Validation(e.message().to_string()))?;

        let account_name =
            Collaborator::account_name(&request.container_name, &request.collaborator_username)
                .map_err(|e| LifecycleError::Validation(e.message().to_string()))?;

        self.runtime
            .exec(
                &request.container_name,
                &[
                    "useradd".into(),
                    "--create-home".into(),
                    request.collaborator_username.clone(),
                ],
            )
            .await?;

        self.install_sudoers_dropin(&request).await?;
        self.enable_session_logging(&request.container_name, &request.collaborator_username)
            .await?;
        self.install_ssh_key(&request.container_name, &request.collaborator_username, &request.ssh_public_key)
            .await?;

        if request.grant_container_runtime {
            self.grant_runtime_group_membership(&request.container_name, &request.collaborator_username)
                .await?;
        }

        self.accounts.create_proxy_account(&account_name).await?;

        let collaborator = Collaborator {
            id: uuid::Uuid::new_v4(),
            container_name: request.container_name,
            owner_username: request.owner_username,
            collaborator_username: request.collaborator_username,
            account_name,
            ssh_public_key: request.ssh_public_key,
            has_sudo: request.has_sudo,
            has_container_runtime: request.grant_container_runtime,
            created_at: Utc::now(),
            created_by: request.created_by,
        };
        self.repository.create(&collaborator).await?;
        Ok(collaborator)
    }

    /// Idempotent: removing an already-absent collaborator is a no-op
    /// (§4.L).
    pub async fn remove(&self, id: uuid::Uuid) -> Result<(), LifecycleError> {
        self.repository.remove(id).await?;
        Ok(())
    }

    pub async fn remove_all_for_container(&self, container_name: &str) -> Result<(), LifecycleError> {
        self.repository.remove_all_for_container(container_name).await?;
        Ok(())
    }

    pub async fn list_for_container(
        &self,
        container_name: &str,
    ) -> Result<Vec<Collaborator>, LifecycleError> {
        Ok(self.repository.list_for_container(container_name).await?)
    }

    pub fn repository(&self) -> &CollaboratorRepository {
        &self.repository
    }

    async fn install_sudoers_dropin(&self, request: &AddCollaboratorRequest) -> Result<(), LifecycleError> {
        let line = if request.has_sudo {
            format!("{} ALL=(ALL) NOPASSWD:ALL\n", request.collaborator_username)
        } else {
            format!(
                "{} ALL=({}) NOPASSWD: /usr/bin/su - {}\n",
                request.collaborator_username, request.owner_username, request.owner_username
            )
        };
        self.runtime
            .file_push(
                &request.container_name,
                &format!("/etc/sudoers.d/{}", request.collaborator_username),
                line.as_bytes(),
                0o440,
            )
            .await?;
        Ok(())
    }

    async fn enable_session_logging(
        &self,
        container_name: &str,
        collaborator_username: &str,
    ) -> Result<(), LifecycleError> {
        let config = format!(
            "Defaults:{collaborator_username} log_input, log_output\nDefaults:{collaborator_username} iolog_dir=/var/log/sudo-io/{collaborator_username}\n"
        );
        self.runtime
            .file_push(
                container_name,
                &format!("/etc/sudoers.d/{collaborator_username}-session-log"),
                config.as_bytes(),
                0o440,
            )
            .await?;
        self.runtime
            .exec(
                container_name,
                &[
                    "mkdir".into(),
                    "-p".into(),
                    format!("/var/log/sudo-io/{collaborator_username}"),
                ],
            )
            .await?;
        Ok(())
    }

    async fn install_ssh_key(
        &self,
        container_name: &str,
        collaborator_username: &str,
        ssh_public_key: &str,
    ) -> Result<(), LifecycleError> {
        let path = format!("/home/{collaborator_username}/.ssh/authorized_keys");
        let mut contents = ssh_public_key.to_string();
        contents.push('\n');
        self.runtime.file_push(container_name, &path, contents.as_bytes(), 0o600).await?;
        Ok(())
    }

    /// Grants membership in whichever container-runtime groups exist
    /// (§4.L: "if those groups exist"); a group that isn't present is
    /// skipped, not an error.
    async fn grant_runtime_group_membership(
        &self,
        container_name: &str,
        collaborator_username: &str,
    ) -> Result<(), LifecycleError> {
        for group in CONTAINER_RUNTIME_GROUPS {
            let result = self
                .runtime
                .exec(
                    container_name,
                    &[
                        "usermod".into(),
                        "-aG".into(),
                        group.to_string(),
                        collaborator_username.to_string(),
                    ],
                )
                .await;
            if let Err(err) = result {
                tracing::debug!(group, error = %err, "runtime group not present, skipping");
            }
        }
        Ok(())
    }
}
