use containarium_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("lock acquisition failed: {0}")]
    LockTimeout(String),
    #[error("account command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[source] std::io::Error),
}

impl AccountError {
    /// Lock contention is transient by the rules of §4.B/§7; everything
    /// else (bad input, a command that fails for a non-lock reason) is
    /// fatal once the retry budget observed it wasn't lock-related.
    pub fn is_transient(&self) -> bool {
        matches!(self, AccountError::LockTimeout(_))
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match &err {
            AccountError::InvalidUsername(_) => ApiError::validation(err.to_string()),
            _ if err.is_transient() => ApiError::transient(err.to_string()),
            _ => ApiError::fatal(err.to_string()),
        }
    }
}
