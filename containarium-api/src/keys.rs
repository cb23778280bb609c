use std::path::{Path, PathBuf};

use containarium_core::ApiError;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// `/home/{account}/.ssh/authorized_keys`, matching where the host account
/// manager (§4.B) places jump accounts' home directories.
pub fn authorized_keys_path(home_root: &Path, account: &str) -> PathBuf {
    home_root.join(account).join(".ssh").join("authorized_keys")
}

pub async fn list_authorized_keys(path: &Path) -> Result<Vec<String>, ApiError> {
    match fs::read_to_string(path).await {
        Ok(contents) => Ok(contents.lines().map(str::to_string).filter(|l| !l.is_empty()).collect()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(err) => Err(ApiError::from(err)),
    }
}

/// Appends `public_key` if it isn't already present (§4.H: "mutation is
/// idempotent and skips duplicates").
pub async fn add_authorized_key(path: &Path, public_key: &str) -> Result<bool, ApiError> {
    let existing = list_authorized_keys(path).await?;
    if existing.iter().any(|k| k == public_key) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(public_key.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(true)
}
