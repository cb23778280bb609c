use containarium_core::ApiError;
use containarium_accounts::AccountError;
use containarium_data::DataError;
use containarium_runtime::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("{0}")]
    Validation(String),
    #[error("concurrent create already in progress for '{0}'")]
    CreateInProgress(String),
    #[error("at least one resize field must be set")]
    EmptyResize,
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Runtime(e) => e.into(),
            LifecycleError::Account(e) => e.into(),
            LifecycleError::Data(e) => e.into(),
            LifecycleError::Validation(msg) => ApiError::validation(msg),
            LifecycleError::CreateInProgress(name) => {
                ApiError::conflict(format!("create already in progress for '{name}'"))
            }
            LifecycleError::EmptyResize => ApiError::validation(
                "at least one of cpu_cores, memory_bytes, disk_bytes must be set",
            ),
        }
    }
}
