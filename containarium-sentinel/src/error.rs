#[derive(Debug, thiserror::Error)]
pub enum SentinelError {
    #[error("probe failed: {0}")]
    ProbeFailed(String),
    #[error("packet table mutation failed: {0}")]
    PacketTable(#[from] containarium_proxy::ProxyError),
    #[error("certificate fetch failed: {0}")]
    CertFetch(String),
    #[error("no certificate available for {0} (exact, wildcard, and self-signed fallback all missing)")]
    NoCertificateAvailable(String),
    #[error("TLS setup failed: {0}")]
    Tls(String),
    #[error("invalid forwarded port spec: {0}")]
    InvalidForwardPort(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
