use std::path::Path;

use containarium_core::domain::CertificatePair;
use containarium_core::ApiError;
use tokio::fs;

/// Reads the proxy container's certificate directory (§3, §4.H `/certs`):
/// one subdirectory per domain, each holding `fullchain.pem`/`privkey.pem`.
/// Exposed only over the authenticated internal channel for sentinel sync.
pub async fn list_certificates(certs_dir: &Path) -> Result<Vec<CertificatePair>, ApiError> {
    let mut entries = match fs::read_dir(certs_dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(ApiError::from(err)),
    };

    let mut pairs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let domain = entry.file_name().to_string_lossy().into_owned();
        let dir = entry.path();
        let (Ok(cert_pem), Ok(key_pem)) = (
            fs::read_to_string(dir.join("fullchain.pem")).await,
            fs::read_to_string(dir.join("privkey.pem")).await,
        ) else {
            continue; // partially-issued domain, skip until both files land
        };
        pairs.push(CertificatePair { domain, cert_pem, key_pem });
    }
    Ok(pairs)
}
