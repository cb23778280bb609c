use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpProtocol {
    Http,
    Grpc,
}

/// An HTTP/gRPC route (§3). `full_domain` is the uniqueness key: the
/// reconciler (§4.F) and the proxy both key off of it, never off `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: uuid::Uuid,
    pub subdomain: String,
    pub full_domain: String,
    pub target_ip: String,
    pub target_port: u16,
    pub protocol: HttpProtocol,
    pub active: bool,
    pub owner_app_id: Option<uuid::Uuid>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Route {
    /// The domain-resolution rule of §3/§4.F: a dotted `full_domain` is used
    /// verbatim; a bare label is anchored under `base_domain`.
    ///
    /// This is the single function both the reconciler's diffing and its
    /// proxy-upsert call must agree on — see §8's "Testable Properties" and
    /// the FQDN churn warning in §4.F.
    pub fn canonical_host(full_domain: &str, subdomain: &str, base_domain: &str) -> String {
        if full_domain.contains('.') {
            full_domain.to_string()
        } else {
            format!("{subdomain}.{base_domain}")
        }
    }

    pub fn host(&self, base_domain: &str) -> String {
        Self::canonical_host(&self.full_domain, &self.subdomain, base_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_full_domain_used_verbatim() {
        let host = Route::canonical_host("api.acme.app", "", "example.com");
        assert_eq!(host, "api.acme.app");
    }

    #[test]
    fn bare_label_anchored_under_base_domain() {
        let host = Route::canonical_host("alice-api", "alice-api", "example.com");
        assert_eq!(host, "alice-api.example.com");
    }

    #[test]
    fn fqdn_never_gets_base_domain_appended_twice() {
        let host = Route::canonical_host("api.acme.app", "api", "example.com");
        assert_ne!(host, "api.acme.app.example.com");
        assert_eq!(host, "api.acme.app");
    }
}
