use std::io::BufReader;
use std::path::Path;

use crate::error::SecurityError;

/// Loaded mTLS material for the gRPC peer-to-peer surface (§4.H, §4.I).
pub struct MtlsMaterial {
    pub cert_chain: Vec<rustls::pki_types::CertificateDer<'static>>,
    pub private_key: rustls::pki_types::PrivateKeyDer<'static>,
    pub client_ca: Vec<rustls::pki_types::CertificateDer<'static>>,
}

/// Validates that cert/key files exist and parse before the gRPC server
/// binds; a missing or malformed file is a startup-time `Fatal`, never a
/// lazily-discovered runtime error (§4.I: "rejects otherwise").
pub fn load_mtls_material(
    cert_path: &Path,
    key_path: &Path,
    client_ca_path: &Path,
) -> Result<MtlsMaterial, SecurityError> {
    let cert_chain = read_certs(cert_path)?;
    let private_key = read_private_key(key_path)?;
    let client_ca = read_certs(client_ca_path)?;

    Ok(MtlsMaterial {
        cert_chain,
        private_key,
        client_ca,
    })
}

fn read_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, SecurityError> {
    let file = std::fs::File::open(path)
        .map_err(|_| SecurityError::CertificateNotFound(path.display().to_string()))?;
    let mut reader = BufReader::new(file);
    let certs: Result<Vec<_>, _> = rustls_pemfile::certs(&mut reader).collect();
    let certs = certs.map_err(|err| SecurityError::MalformedCertificate(err.to_string()))?;
    if certs.is_empty() {
        return Err(SecurityError::MalformedCertificate(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(certs)
}

fn read_private_key(
    path: &Path,
) -> Result<rustls::pki_types::PrivateKeyDer<'static>, SecurityError> {
    let file = std::fs::File::open(path)
        .map_err(|_| SecurityError::CertificateNotFound(path.display().to_string()))?;
    let mut reader = BufReader::new(file);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|err| SecurityError::MalformedCertificate(err.to_string()))?
        .ok_or_else(|| {
            SecurityError::MalformedCertificate(format!("no private key found in {}", path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_cert_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.pem");
        let err = read_certs(&missing).unwrap_err();
        assert!(matches!(err, SecurityError::CertificateNotFound(_)));
    }

    #[test]
    fn empty_cert_file_is_rejected_as_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pem");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "not a certificate").unwrap();
        let err = read_certs(&path).unwrap_err();
        assert!(matches!(err, SecurityError::MalformedCertificate(_)));
    }
}
