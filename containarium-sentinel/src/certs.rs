use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Deserialize;

use crate::error::SentinelError;

#[derive(Debug, Clone, Deserialize)]
struct CertificatePairDto {
    domain: String,
    cert_pem: String,
    key_pem: String,
}

#[derive(Debug, Clone)]
pub struct CachedCert {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Certs fetched from the control plane's `/certs` endpoint (§4.H, §4.K),
/// looked up by SNI with exact -> wildcard -> self-signed fallback.
pub struct CertCache {
    by_domain: RwLock<HashMap<String, CachedCert>>,
    fallback: CachedCert,
    client: reqwest::Client,
    api_base_url: String,
    api_token: String,
    cache_dir: PathBuf,
}

impl CertCache {
    pub fn new(
        api_base_url: impl Into<String>,
        api_token: impl Into<String>,
        cache_dir: PathBuf,
        fallback: CachedCert,
    ) -> Self {
        CertCache {
            by_domain: RwLock::new(HashMap::new()),
            fallback,
            client: reqwest::Client::new(),
            api_base_url: api_base_url.into(),
            api_token: api_token.into(),
            cache_dir,
        }
    }

    pub fn load_fallback(cert_path: &Path, key_path: &Path) -> Result<CachedCert, SentinelError> {
        let cert_pem = std::fs::read_to_string(cert_path)?;
        let key_pem = std::fs::read_to_string(key_path)?;
        Ok(CachedCert { cert_pem, key_pem })
    }

    /// Re-fetches the full cert set from the host over `/certs` (§4.K:
    /// "immediately re-sync certs on the latter transition").
    pub async fn sync(&self) -> Result<usize, SentinelError> {
        let url = format!("{}/certs", self.api_base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| SentinelError::CertFetch(e.to_string()))?;
        let pairs: Vec<CertificatePairDto> = response
            .error_for_status()
            .map_err(|e| SentinelError::CertFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| SentinelError::CertFetch(e.to_string()))?;

        tokio::fs::create_dir_all(&self.cache_dir).await.ok();
        let mut guard = self.by_domain.write().expect("cert cache lock poisoned");
        guard.clear();
        for pair in &pairs {
            guard.insert(
                pair.domain.clone(),
                CachedCert {
                    cert_pem: pair.cert_pem.clone(),
                    key_pem: pair.key_pem.clone(),
                },
            );
        }
        let count = guard.len();
        drop(guard);
        for pair in pairs {
            let dir = self.cache_dir.join(&pair.domain);
            let _ = tokio::fs::create_dir_all(&dir).await;
            let _ = tokio::fs::write(dir.join("fullchain.pem"), &pair.cert_pem).await;
            let _ = tokio::fs::write(dir.join("privkey.pem"), &pair.key_pem).await;
        }
        Ok(count)
    }

    /// Exact match, then the first-label-stripped wildcard, then the
    /// self-signed fallback (§4.K: "exact-match -> wildcard -> self-signed
    /// fallback (SNI)").
    pub fn lookup(&self, sni: &str) -> CachedCert {
        let guard = self.by_domain.read().expect("cert cache lock poisoned");
        if let Some(cert) = guard.get(sni) {
            return cert.clone();
        }
        if let Some((_, rest)) = sni.split_once('.') {
            let wildcard = format!("*.{rest}");
            if let Some(cert) = guard.get(&wildcard) {
                return cert.clone();
            }
        }
        self.fallback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with(pairs: &[(&str, &str, &str)]) -> CertCache {
        let mut map = HashMap::new();
        for (domain, cert, key) in pairs {
            map.insert(
                domain.to_string(),
                CachedCert { cert_pem: cert.to_string(), key_pem: key.to_string() },
            );
        }
        CertCache {
            by_domain: RwLock::new(map),
            fallback: CachedCert { cert_pem: "fallback-cert".into(), key_pem: "fallback-key".into() },
            client: reqwest::Client::new(),
            api_base_url: String::new(),
            api_token: String::new(),
            cache_dir: PathBuf::new(),
        }
    }

    #[test]
    fn exact_match_wins() {
        let cache = cache_with(&[("a.example.com", "exact", "exact-key")]);
        assert_eq!(cache.lookup("a.example.com").cert_pem, "exact");
    }

    #[test]
    fn falls_back_to_wildcard() {
        let cache = cache_with(&[("*.example.com", "wild", "wild-key")]);
        assert_eq!(cache.lookup("sub.example.com").cert_pem, "wild");
    }

    #[test]
    fn falls_back_to_self_signed_when_nothing_matches() {
        let cache = cache_with(&[]);
        assert_eq!(cache.lookup("unknown.example.com").cert_pem, "fallback-cert");
    }

    #[test]
    fn exact_match_takes_priority_over_wildcard() {
        let cache = cache_with(&[
            ("a.example.com", "exact", "exact-key"),
            ("*.example.com", "wild", "wild-key"),
        ]);
        assert_eq!(cache.lookup("a.example.com").cert_pem, "exact");
    }
}
