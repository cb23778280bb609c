//! The error kinds of §7, collapsed into a single type that crosses every
//! REST/gRPC boundary.
//!
//! Lower crates (`containarium-runtime`, `containarium-accounts`, …) define
//! their own narrow error enums and convert into `ApiError` at the
//! lifecycle-manager boundary; they are never threaded through a handler
//! directly. Conversion is intentionally lossy on the wire (message only) —
//! full detail goes to the trace span, not the client.

use serde::Serialize;

/// The error kinds of §7. `Partial` is not actually an error — see
/// [`Outcome`] — but the remaining five map directly onto HTTP status /
/// gRPC status code pairs.
#[derive(Debug)]
pub enum ApiError {
    /// Bad name, bad CIDR, length overflow. 400 / `InvalidArgument`.
    Validation(String),
    /// Missing container/app/route. 404 / `NotFound`.
    NotFound(String),
    /// Concurrent create of the same name, or a uniqueness violation. 409 / `AlreadyExists`.
    Conflict(String),
    /// Lock contention, connection refused, temporary runtime errors that
    /// exhausted their subsystem-local retry budget. 503 / `Unavailable`.
    Transient(String),
    /// Malformed runtime response, missing certs when mTLS is required.
    /// Surfaced unmodified after structured logging. 500 / `Internal`.
    Fatal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// A short machine-readable tag, used in logs and in the JSON error body.
    pub fn tag(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Transient(_) => "transient",
            ApiError::Fatal(_) => "fatal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Transient(m)
            | ApiError::Fatal(m) => m,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.tag(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Fatal(err.to_string())
    }
}

/// Wraps a successful result that may carry a non-fatal warning — the
/// `Partial` kind of §7 (e.g. TLS issuance failed but the route was still
/// installed). Never an `Err`; the warning rides along with the value.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    #[serde(flatten)]
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn with_warning(value: T, warning: impl Into<String>) -> Self {
        Self {
            value,
            warning: Some(warning.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_kind() {
        assert_eq!(ApiError::validation("x").tag(), "validation");
        assert_eq!(ApiError::not_found("x").tag(), "not_found");
        assert_eq!(ApiError::conflict("x").tag(), "conflict");
        assert_eq!(ApiError::transient("x").tag(), "transient");
        assert_eq!(ApiError::fatal("x").tag(), "fatal");
    }

    #[test]
    fn display_includes_tag_and_message() {
        let err = ApiError::not_found("container bob");
        assert_eq!(err.to_string(), "not_found: container bob");
    }

    #[test]
    fn outcome_ok_has_no_warning() {
        let o = Outcome::ok(42);
        assert_eq!(o.value, 42);
        assert!(o.warning.is_none());
    }
}
