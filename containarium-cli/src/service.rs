use tokio::process::Command;
use tracing::warn;

use crate::error::CliError;

const UNIT_NAME: &str = "containarium-daemon";
const UNIT_PATH: &str = "/etc/systemd/system/containarium-daemon.service";

const UNIT_TEMPLATE: &str = "\
[Unit]
Description=Containarium control-plane daemon
After=network-online.target
Wants=network-online.target

[Service]
Type=simple
ExecStart={exec_path}
Restart=on-failure
RestartSec=5
EnvironmentFile=-/etc/containarium/daemon.env

[Install]
WantedBy=multi-user.target
";

/// `service install` (SPEC_FULL.md's supplemented features): writes a
/// systemd unit pointing at the given daemon binary and enables it, the
/// same external-process idiom as the host account manager's
/// stop/restart of its own unit.
pub async fn install(exec_path: &str) -> Result<(), CliError> {
    let unit = UNIT_TEMPLATE.replace("{exec_path}", exec_path);
    tokio::fs::write(UNIT_PATH, unit)
        .await
        .map_err(|e| CliError::Runtime(format!("writing {UNIT_PATH}: {e}")))?;

    run_systemctl(&["daemon-reload"]).await?;
    run_systemctl(&["enable", UNIT_NAME]).await?;
    Ok(())
}

pub async fn status() -> Result<String, CliError> {
    let output = Command::new("systemctl")
        .args(["status", UNIT_NAME, "--no-pager"])
        .output()
        .await
        .map_err(|e| CliError::Runtime(format!("invoking systemctl: {e}")))?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

pub async fn uninstall() -> Result<(), CliError> {
    let _ = run_systemctl(&["disable", "--now", UNIT_NAME]).await;
    if tokio::fs::try_exists(UNIT_PATH).await.unwrap_or(false) {
        tokio::fs::remove_file(UNIT_PATH)
            .await
            .map_err(|e| CliError::Runtime(format!("removing {UNIT_PATH}: {e}")))?;
    }
    run_systemctl(&["daemon-reload"]).await?;
    Ok(())
}

async fn run_systemctl(args: &[&str]) -> Result<(), CliError> {
    let status = Command::new("systemctl")
        .args(args)
        .status()
        .await
        .map_err(|e| CliError::Runtime(format!("invoking systemctl {args:?}: {e}")))?;
    if !status.success() {
        warn!(?args, code = ?status.code(), "systemctl returned non-zero");
        return Err(CliError::Runtime(format!("systemctl {args:?} failed: {status}")));
    }
    Ok(())
}
