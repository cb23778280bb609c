use std::io::BufReader;
use std::sync::Arc;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, warn};

use crate::certs::CertCache;
use crate::error::SentinelError;

const STATUS_PAGE: &str = include_str!("../assets/maintenance.html");

struct CacheResolver {
    certs: Arc<CertCache>,
}

impl ResolvesServerCert for CacheResolver {
    fn resolve(&self, client_hello: ClientHello) -> Option<Arc<CertifiedKey>> {
        let sni = client_hello.server_name()?;
        let cached = self.certs.lookup(sni);
        build_certified_key(&cached.cert_pem, &cached.key_pem).ok()
    }
}

fn build_certified_key(cert_pem: &str, key_pem: &str) -> Result<Arc<CertifiedKey>, SentinelError> {
    let mut cert_reader = BufReader::new(cert_pem.as_bytes());
    let certs: Result<Vec<_>, _> = rustls_pemfile::certs(&mut cert_reader).collect();
    let certs = certs.map_err(|e| SentinelError::Tls(e.to_string()))?;
    if certs.is_empty() {
        return Err(SentinelError::Tls("no certificates in PEM".into()));
    }
    let mut key_reader = BufReader::new(key_pem.as_bytes());
    let key = rustls_pemfile::private_key(&mut key_reader)
        .map_err(|e| SentinelError::Tls(e.to_string()))?
        .ok_or_else(|| SentinelError::Tls("no private key in PEM".into()))?;
    let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key)
        .map_err(|e| SentinelError::Tls(e.to_string()))?;
    Ok(Arc::new(CertifiedKey::new(certs, signing_key)))
}

/// MAINTENANCE mode (§4.K): terminates TLS with certs periodically synced
/// from the host and serves a static outage page. Runs until the handle is
/// aborted by the transition back to PROXY.
pub async fn serve_maintenance(addr: String, certs: Arc<CertCache>) -> Result<(), SentinelError> {
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(CacheResolver { certs }));
    let acceptor = TlsAcceptor::from(Arc::new(config));
    let listener = TcpListener::bind(&addr).await?;
    debug!(addr, "maintenance TLS listener bound");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "maintenance listener accept failed");
                continue;
            }
        };
        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, acceptor).await {
                debug!(%peer, error = %err, "maintenance connection ended with error");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    acceptor: TlsAcceptor,
) -> Result<(), SentinelError> {
    let mut tls = acceptor
        .accept(stream)
        .await
        .map_err(|e| SentinelError::Tls(e.to_string()))?;

    let mut buf = [0u8; 1024];
    let _ = tls.read(&mut buf).await;

    let body = STATUS_PAGE;
    let response = format!(
        "HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    tls.write_all(response.as_bytes()).await?;
    tls.shutdown().await?;
    Ok(())
}
