use std::sync::Arc;

use containarium_accounts::HostAccountManager;
use containarium_core::domain::{Container, ContainerState, ResourceLimits, Role};
use containarium_core::{CancellationToken, Event, EventPayload};
use containarium_events::EventBus;
use containarium_runtime::{CreateSpec, DeviceSize, RuntimeAdapter};
use dashmap::DashMap;
use tracing::{error, info, warn};

use crate::create::{CreateContainerRequest, BASE_PACKAGES, CONTAINER_RUNTIME_PACKAGES};
use crate::error::LifecycleError;
use crate::locks::ContainerLocks;

/// Tracks the *declared* state of a container across its lifecycle. The
/// runtime itself only knows Running/Stopped/etc; `Creating` exists only
/// here, between "create accepted" and "runtime reports Running" (§4.C:
/// "Creation supports an async mode").
pub struct ContainerLifecycleManager {
    runtime: Arc<dyn RuntimeAdapter>,
    accounts: Arc<HostAccountManager>,
    events: EventBus,
    locks: ContainerLocks,
    declared_states: DashMap<String, ContainerState>,
}

impl ContainerLifecycleManager {
    pub fn new(
        runtime: Arc<dyn RuntimeAdapter>,
        accounts: Arc<HostAccountManager>,
        events: EventBus,
    ) -> Self {
        ContainerLifecycleManager {
            runtime,
            accounts,
            events,
            locks: ContainerLocks::new(),
            declared_states: DashMap::new(),
        }
    }

    /// Returns immediately with state `Creating`; the stages run on a
    /// spawned task. Concurrent create of the same username is rejected
    /// (§4.C) via [`ContainerLocks::try_lock`] rather than awaiting the
    /// lock — a second caller should see a `Conflict`, not queue.
    pub fn create_async(
        self: &Arc<Self>,
        request: CreateContainerRequest,
        cancellation: CancellationToken,
    ) -> Result<String, LifecycleError> {
        let name = Container::user_container_name(&request.username);

        let guard = self
            .locks
            .try_lock(&name)
            .ok_or_else(|| LifecycleError::CreateInProgress(name.clone()))?;

        self.declared_states.insert(name.clone(), ContainerState::Creating);

        let manager = Arc::clone(self);
        let task_name = name.clone();
        tokio::spawn(async move {
            let _guard = guard;
            let result = manager.run_create_stages(&task_name, &request, &cancellation).await;
            match result {
                Ok(()) => {
                    manager
                        .declared_states
                        .insert(task_name.clone(), ContainerState::Running);
                    manager.events.publish(Event::new(EventPayload::ContainerStateChanged {
                        name: task_name,
                        from: "creating".into(),
                        to: "running".into(),
                    }));
                }
                Err(err) => {
                    error!(name = %task_name, error = %err, "container create failed, rolling back");
                    manager
                        .declared_states
                        .insert(task_name.clone(), ContainerState::Error);
                    manager.rollback(&task_name).await;
                    manager.events.publish(Event::new(EventPayload::ContainerStateChanged {
                        name: task_name,
                        from: "creating".into(),
                        to: "error".into(),
                    }));
                }
            }
        });

        Ok(name)
    }

    pub fn declared_state(&self, name: &str) -> Option<ContainerState> {
        self.declared_states.get(name).map(|s| *s)
    }

    /// Stages 1-8 of §4.C, in order, with cancellation checked at each
    /// stage boundary.
    async fn run_create_stages(
        &self,
        name: &str,
        request: &CreateContainerRequest,
        cancellation: &CancellationToken,
    ) -> Result<(), LifecycleError> {
        // Stage 1: reserve runtime resource.
        let spec = CreateSpec {
            name: name.to_string(),
            image: request.image.clone(),
            static_ip: request.static_ip.clone(),
            limits: request.limits,
            nesting: request.nesting,
            privileged: false,
        };
        self.runtime.create(&spec).await?;
        check_cancelled(cancellation)?;

        // Stage 2: start + labels.
        if request.auto_start {
            self.runtime.start(name).await?;
        }
        let mut labels = request.labels.clone();
        labels.insert("containarium.role/kind".into(), Role::User.label_value().into());
        self.runtime.apply_labels(name, &labels).await?;
        check_cancelled(cancellation)?;

        // Stage 3: host jump account.
        self.accounts.create_proxy_account(&request.username).await?;
        check_cancelled(cancellation)?;

        // Stage 4: wait for network.
        self.runtime
            .wait_for_network(name, request.network_wait_timeout)
            .await?;
        check_cancelled(cancellation)?;

        // Stage 5: package installation.
        if let Some(stack) = &request.stack {
            for repo_cmd in &stack.pre_install_repo_commands {
                self.runtime.exec(name, repo_cmd).await?;
            }
        }
        let mut packages: Vec<String> = BASE_PACKAGES.iter().map(|s| s.to_string()).collect();
        if request.install_container_runtime {
            packages.extend(CONTAINER_RUNTIME_PACKAGES.iter().map(|s| s.to_string()));
        }
        if let Some(stack) = &request.stack {
            packages.extend(stack.packages.iter().cloned());
        }
        let mut install_argv = vec!["apt-get".to_string(), "install".to_string(), "-y".to_string()];
        install_argv.extend(packages);
        self.runtime.exec(name, &install_argv).await?;
        check_cancelled(cancellation)?;

        // Stage 6: in-container user + passwordless sudoers.
        self.runtime
            .exec(
                name,
                &[
                    "useradd".into(),
                    "--create-home".into(),
                    "--groups".into(),
                    "sudo".into(),
                    request.username.clone(),
                ],
            )
            .await?;
        let sudoers_line = format!("{} ALL=(ALL) NOPASSWD:ALL\n", request.username);
        self.runtime
            .file_push(
                name,
                &format!("/etc/sudoers.d/{}", request.username),
                sudoers_line.as_bytes(),
                0o440,
            )
            .await?;
        check_cancelled(cancellation)?;

        // Stage 7: SSH keys, including the host's own key for ProxyJump.
        let mut authorized_keys = request.ssh_public_keys.join("\n");
        authorized_keys.push('\n');
        authorized_keys.push_str(&request.host_ssh_public_key);
        authorized_keys.push('\n');
        let ssh_dir_path = format!("/home/{}/.ssh/authorized_keys", request.username);
        self.runtime
            .file_push(name, &ssh_dir_path, authorized_keys.as_bytes(), 0o600)
            .await?;
        check_cancelled(cancellation)?;

        // Stage 8: stack post-install, as the in-container user.
        if let Some(stack) = &request.stack {
            for cmd in &stack.post_install_commands {
                let mut argv = vec!["su".to_string(), "-".to_string(), request.username.clone(), "-c".to_string()];
                argv.push(cmd.join(" "));
                self.runtime.exec(name, &argv).await?;
            }
        }

        Ok(())
    }

    /// Failures after stage 1 trigger force-stop + delete (§4.C).
    async fn rollback(&self, name: &str) {
        warn!(name, "rolling back partially created container");
        if let Err(err) = self.runtime.stop(name, true).await {
            warn!(name, error = %err, "rollback stop failed, continuing to delete");
        }
        if let Err(err) = self.runtime.delete(name).await {
            error!(name, error = %err, "rollback delete failed, container may be orphaned");
        }
    }

    pub async fn resize(&self, name: &str, limits: ResourceLimits) -> Result<(), LifecycleError> {
        if limits.is_empty() {
            return Err(LifecycleError::EmptyResize);
        }
        let _guard = self.locks.lock(name).await;

        if let Some(cores) = limits.cpu_cores {
            self.runtime
                .set_config(name, "limits.cpu", &cores.to_string())
                .await?;
        }
        if let Some(mem) = limits.memory_bytes {
            self.runtime
                .set_config(name, "limits.memory", &mem.to_string())
                .await?;
        }
        if let Some(disk) = limits.disk_bytes {
            self.runtime
                .set_device_size(name, DeviceSize { disk_bytes: disk })
                .await?;
        }
        info!(name, "resized container");
        Ok(())
    }

    pub async fn delete(&self, name: &str) -> Result<(), LifecycleError> {
        let _guard = self.locks.lock(name).await;
        self.runtime.stop(name, true).await.ok();
        self.runtime.delete(name).await?;
        self.declared_states.remove(name);
        self.events
            .publish(Event::new(EventPayload::ContainerDeleted { name: name.to_string() }));
        Ok(())
    }
}

fn check_cancelled(token: &CancellationToken) -> Result<(), LifecycleError> {
    if token.is_cancelled() {
        return Err(LifecycleError::Validation("create cancelled".into()));
    }
    Ok(())
}
