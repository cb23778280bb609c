use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum L4Protocol {
    Tcp,
    Udp,
}

/// Layer-4 port forward without TLS termination (§3). `(external_port,
/// protocol)` is the uniqueness key, mirroring `Route::full_domain`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassthroughRoute {
    pub external_port: u16,
    pub target_ip: String,
    pub target_port: u16,
    pub protocol: L4Protocol,
    pub description: String,
}

impl PassthroughRoute {
    pub fn key(&self) -> (u16, L4Protocol) {
        (self.external_port, self.protocol)
    }
}
