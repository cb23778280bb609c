use serde::{Deserialize, Serialize};

use crate::error::ProxyError;

/// What the reverse proxy's own admin API reports as installed — the
/// observed-state half of §4.F's diff. `srv0` is the fixed server name
/// every route installs under (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedRoute {
    pub host: String,
    pub target_ip: String,
    pub target_port: u16,
    pub http2_cleartext: bool,
}

#[derive(Debug, Serialize)]
struct UpsertRouteBody {
    server_name: String,
    host: String,
    target_ip: String,
    target_port: u16,
    http2_cleartext: bool,
}

/// HTTP/JSON client for the reverse proxy's admin API (§6).
pub struct ProxyAdminClient {
    base_url: String,
    client: reqwest::Client,
    server_name: String,
}

impl ProxyAdminClient {
    pub fn new(base_url: impl Into<String>, server_name: impl Into<String>) -> Self {
        ProxyAdminClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
            server_name: server_name.into(),
        }
    }

    pub async fn list_routes(&self) -> Result<Vec<ObservedRoute>, ProxyError> {
        self.client
            .get(format!("{}/routes", self.base_url))
            .send()
            .await
            .map_err(ProxyError::AdminApi)?
            .json()
            .await
            .map_err(ProxyError::AdminApi)
    }

    pub async fn upsert_route(
        &self,
        host: &str,
        target_ip: &str,
        target_port: u16,
        http2_cleartext: bool,
    ) -> Result<(), ProxyError> {
        self.client
            .post(format!("{}/routes", self.base_url))
            .json(&UpsertRouteBody {
                server_name: self.server_name.clone(),
                host: host.to_string(),
                target_ip: target_ip.to_string(),
                target_port,
                http2_cleartext,
            })
            .send()
            .await
            .map_err(ProxyError::AdminApi)?
            .error_for_status()
            .map_err(ProxyError::AdminApi)?;
        Ok(())
    }

    pub async fn delete_route(&self, host: &str) -> Result<(), ProxyError> {
        self.client
            .delete(format!("{}/routes/{}", self.base_url, host))
            .send()
            .await
            .map_err(ProxyError::AdminApi)?
            .error_for_status()
            .map_err(ProxyError::AdminApi)?;
        Ok(())
    }

    /// Requests ACME issuance for `host`. A failure here is non-fatal to
    /// the caller — the route still gets installed under a wildcard cert
    /// if one exists (§4.F).
    pub async fn extend_tls_policy(&self, host: &str) -> Result<(), ProxyError> {
        self.client
            .post(format!("{}/tls/policies", self.base_url))
            .json(&serde_json::json!({ "host": host }))
            .send()
            .await
            .map_err(ProxyError::AdminApi)?
            .error_for_status()
            .map_err(ProxyError::AdminApi)?;
        Ok(())
    }
}
