use std::path::{Path, PathBuf};
use std::time::Duration;

use containarium_core::validation::validate_unix_username;
use tokio::process::Command;
use tracing::{info, warn};

use crate::backoff::{is_lock_error, RetryPolicy};
use crate::error::AccountError;
use crate::flock::ProcessLock;

#[derive(Debug, Clone)]
pub struct HostAccountManagerConfig {
    /// Fixed lock file serialising our own user ops (§4.B point 1).
    pub lock_file_path: PathBuf,
    /// systemd unit name of the cloud-provider accounts daemon.
    pub host_agent_unit: String,
    /// Stale lock files to forcibly remove once the agent is confirmed
    /// stopped (§4.B point 2), e.g. `/etc/.pwd.lock`, `/etc/passwd.lock`.
    pub stale_lock_files: Vec<PathBuf>,
    pub check_interval: Duration,
    pub max_wait: Duration,
}

impl Default for HostAccountManagerConfig {
    fn default() -> Self {
        HostAccountManagerConfig {
            lock_file_path: PathBuf::from("/var/lock/containarium-accounts.lock"),
            host_agent_unit: "google-guest-agent".into(),
            stale_lock_files: vec![
                PathBuf::from("/etc/.pwd.lock"),
                PathBuf::from("/etc/passwd.lock"),
                PathBuf::from("/etc/group.lock"),
                PathBuf::from("/etc/shadow.lock"),
            ],
            check_interval: Duration::from_millis(200),
            max_wait: Duration::from_secs(5),
        }
    }
}

/// Implements the full protocol of §4.B: serialises against the host
/// agent, creates `nologin`/proxy-only accounts for container owners,
/// collaborators, and the sentinel.
pub struct HostAccountManager {
    config: HostAccountManagerConfig,
    retry_policy: RetryPolicy,
}

impl HostAccountManager {
    pub fn new(config: HostAccountManagerConfig) -> Self {
        HostAccountManager {
            config,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub async fn create_proxy_account(&self, username: &str) -> Result<(), AccountError> {
        validate_unix_username(username)
            .map_err(|e| AccountError::InvalidUsername(e.message().to_string()))?;

        self.with_agent_stopped(|| async {
            let _lock = self.acquire_lock().await?;
            self.retry_policy
                .run(|| self.run_useradd(username))
                .await
        })
        .await
    }

    /// Idempotent: deleting an account that's already gone is not an error
    /// (mirrors the collaborator-deletion idempotence of §4.L).
    pub async fn delete_account(&self, username: &str) -> Result<(), AccountError> {
        self.with_agent_stopped(|| async {
            let _lock = self.acquire_lock().await?;
            self.retry_policy
                .run(|| self.run_userdel(username))
                .await
        })
        .await
    }

    async fn acquire_lock(&self) -> Result<ProcessLock, AccountError> {
        ProcessLock::acquire(&self.config.lock_file_path, self.config.check_interval, self.config.max_wait)
            .await
    }

    /// Stop -> remove stale locks -> run the operation -> restart, on
    /// every exit path including error (§4.B point 6: "On all exit paths,
    /// restart the host agent").
    async fn with_agent_stopped<F, Fut, T>(&self, op: F) -> Result<T, AccountError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, AccountError>>,
    {
        self.stop_host_agent().await;
        self.poll_and_clear_stale_locks().await;

        let result = op().await;

        self.restart_host_agent().await;
        result
    }

    async fn stop_host_agent(&self) {
        let unit = &self.config.host_agent_unit;
        match Command::new("systemctl").args(["stop", unit]).status().await {
            Ok(status) if status.success() => info!(unit, "stopped host accounts agent"),
            Ok(status) => warn!(unit, code = ?status.code(), "systemctl stop returned non-zero"),
            Err(err) => warn!(unit, error = %err, "failed to invoke systemctl stop"),
        }
        let _ = Command::new("pkill").args(["-f", unit]).status().await;
    }

    async fn restart_host_agent(&self) {
        let unit = &self.config.host_agent_unit;
        match Command::new("systemctl").args(["start", unit]).status().await {
            Ok(status) if status.success() => info!(unit, "restarted host accounts agent"),
            Ok(status) => warn!(unit, code = ?status.code(), "systemctl start returned non-zero"),
            Err(err) => warn!(unit, error = %err, "failed to invoke systemctl start"),
        }
    }

    /// Poll check-interval/max-wait for residual locks under `/etc`, then
    /// forcibly remove them once the agent is confirmed stopped (§4.B
    /// points 2-3). Proceeds regardless of outcome.
    async fn poll_and_clear_stale_locks(&self) {
        let deadline = tokio::time::Instant::now() + self.config.max_wait;
        while tokio::time::Instant::now() < deadline {
            if self.config.stale_lock_files.iter().all(|p| !p.exists()) {
                break;
            }
            tokio::time::sleep(self.config.check_interval).await;
        }
        for path in &self.config.stale_lock_files {
            remove_stale_lock(path);
        }
    }

    async fn run_useradd(&self, username: &str) -> Result<(), AccountError> {
        let output = Command::new("useradd")
            .args([
                "--system",
                "--shell",
                "/usr/sbin/nologin",
                "--create-home",
                "--no-user-group",
                username,
            ])
            .output()
            .await
            .map_err(AccountError::Io)?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if is_lock_error(&stderr) {
            Err(AccountError::LockTimeout(stderr))
        } else {
            Err(AccountError::CommandFailed(stderr))
        }
    }

    async fn run_userdel(&self, username: &str) -> Result<(), AccountError> {
        let output = Command::new("userdel")
            .args(["--remove", username])
            .output()
            .await
            .map_err(AccountError::Io)?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("does not exist") {
            return Ok(());
        }
        if is_lock_error(&stderr) {
            Err(AccountError::LockTimeout(stderr))
        } else {
            Err(AccountError::CommandFailed(stderr))
        }
    }
}

fn remove_stale_lock(path: &Path) {
    if path.exists() {
        if let Err(err) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %err, "failed to remove stale lock file");
        } else {
            info!(path = %path.display(), "removed stale lock file");
        }
    }
}
