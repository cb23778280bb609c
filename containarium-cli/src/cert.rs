use std::path::Path;

use tokio::process::Command;

use crate::error::CliError;

/// `cert generate` (§6): issuing a certificate authority is an explicit
/// Non-goal, so this shells out to the host's already-installed ACME
/// client the same way `service.rs` shells out to `systemctl` — it drives
/// an external tool rather than reimplementing one, and lands the result
/// under the `{certs_dir}/{domain}/{fullchain.pem,privkey.pem}` layout
/// `containarium-api`'s `/certs` endpoint already reads.
pub async fn generate(domain: &str, certs_dir: &Path, webroot: &Path) -> Result<(), CliError> {
    let target = certs_dir.join(domain);
    tokio::fs::create_dir_all(&target)
        .await
        .map_err(|e| CliError::Runtime(format!("creating {}: {e}", target.display())))?;

    let status = Command::new("certbot")
        .args([
            "certonly",
            "--non-interactive",
            "--agree-tos",
            "--webroot",
            "--webroot-path",
        ])
        .arg(webroot)
        .args(["-d", domain, "--cert-name", domain])
        .status()
        .await
        .map_err(|e| CliError::Runtime(format!("invoking certbot: {e}")))?;
    if !status.success() {
        return Err(CliError::Runtime(format!("certbot exited with {status}")));
    }

    let live_dir = Path::new("/etc/letsencrypt/live").join(domain);
    for (src, dst) in [
        ("fullchain.pem", "fullchain.pem"),
        ("privkey.pem", "privkey.pem"),
    ] {
        tokio::fs::copy(live_dir.join(src), target.join(dst))
            .await
            .map_err(|e| CliError::Runtime(format!("copying {src} for {domain}: {e}")))?;
    }
    Ok(())
}
