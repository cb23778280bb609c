use serde::{Deserialize, Serialize};

/// A domain's certificate material, exposed only over the authenticated
/// `/certs` channel for sentinel synchronisation (§3, §4.K).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificatePair {
    pub domain: String,
    pub cert_pem: String,
    pub key_pem: String,
}
