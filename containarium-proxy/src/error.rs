use containarium_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("reverse-proxy admin API error: {0}")]
    AdminApi(#[source] reqwest::Error),
    #[error("packet table command failed: {0}")]
    PacketTable(String),
    #[error("datastore error: {0}")]
    Data(#[from] containarium_data::DataError),
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match &err {
            ProxyError::AdminApi(e) if e.is_connect() || e.is_timeout() => {
                ApiError::transient(err.to_string())
            }
            ProxyError::Data(_) => ApiError::transient(err.to_string()),
            _ => ApiError::fatal(err.to_string()),
        }
    }
}
