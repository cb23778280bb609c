/// Top-level boot/wiring errors. Once the servers are up, per-request
/// failures are `containarium_core::ApiError`'s problem, not this type's.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("core services bootstrap failed: {0}")]
    Bootstrap(#[from] containarium_lifecycle::LifecycleError),

    #[error("datastore error: {0}")]
    Data(#[from] containarium_data::DataError),

    #[error("runtime adapter unavailable: {0}")]
    Runtime(#[from] containarium_runtime::RuntimeError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
