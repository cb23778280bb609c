use containarium_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime binary not found on PATH: {0}")]
    BinaryNotFound(#[source] which::Error),
    #[error("runtime command timed out")]
    Timeout,
    #[error("runtime command failed (exit {code:?}): {stderr}")]
    CommandFailed { code: Option<i32>, stderr: String },
    #[error("failed to spawn runtime process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("malformed runtime output: {0}")]
    MalformedOutput(String),
    #[error("network did not come up within the deadline")]
    NetworkTimeout,
}

impl RuntimeError {
    /// Transient vs Fatal split of §4.A. Lock contention and connection
    /// refusal read as transient everywhere else in this system; for the
    /// runtime binary, a nonzero exit whose stderr names a resource-busy
    /// condition gets the same treatment. Everything else — a missing
    /// binary, malformed JSON, a definite failure exit — is fatal.
    pub fn is_transient(&self) -> bool {
        match self {
            RuntimeError::Timeout | RuntimeError::NetworkTimeout => true,
            RuntimeError::CommandFailed { stderr, .. } => {
                let lowered = stderr.to_lowercase();
                lowered.contains("busy") || lowered.contains("temporarily unavailable")
            }
            _ => false,
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(err: RuntimeError) -> Self {
        if err.is_transient() {
            ApiError::transient(err.to_string())
        } else {
            ApiError::fatal(err.to_string())
        }
    }
}
