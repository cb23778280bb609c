use containarium_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("datastore connection error: {0}")]
    Connection(#[source] sqlx::Error),
    #[error("query error: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DataError::NotFound("row not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DataError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => DataError::Connection(err),
            _ => DataError::Query(err),
        }
    }
}

/// Orphan-rule-compliant conversion: `containarium-data` owns `DataError`,
/// `containarium-core` owns `ApiError`, so the `impl From` lives here (§7).
impl From<DataError> for ApiError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(msg) => ApiError::not_found(msg),
            DataError::Conflict(msg) => ApiError::conflict(msg),
            DataError::Connection(_) => ApiError::transient(err.to_string()),
            DataError::Query(_) => ApiError::fatal(err.to_string()),
        }
    }
}
