use containarium_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("expiry must be positive, got {0} hours")]
    NonPositiveExpiry(i64),
    #[error("expiry {requested}h exceeds the {cap}h cap")]
    ExpiryExceedsCap { requested: i64, cap: i64 },
    #[error("invalid or expired token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("missing or non-allow-listed Origin header")]
    OriginNotAllowed,
    #[error("mTLS certificate file not found: {0}")]
    CertificateNotFound(String),
    #[error("mTLS certificate material malformed: {0}")]
    MalformedCertificate(String),
}

impl From<SecurityError> for ApiError {
    fn from(err: SecurityError) -> Self {
        match err {
            SecurityError::NonPositiveExpiry(_) | SecurityError::ExpiryExceedsCap { .. } => {
                ApiError::validation(err.to_string())
            }
            SecurityError::InvalidToken(_) | SecurityError::OriginNotAllowed => {
                ApiError::validation(err.to_string())
            }
            SecurityError::CertificateNotFound(_) | SecurityError::MalformedCertificate(_) => {
                ApiError::fatal(err.to_string())
            }
        }
    }
}
