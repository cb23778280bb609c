use std::path::PathBuf;
use std::sync::atomic::AtomicI64;
use std::sync::Arc;

use containarium_events::EventBus;
use containarium_security::{JwtIssuer, OriginAllowList};
use sqlx::PgPool;

use crate::service::ControlService;

/// Shared state for every axum handler. Cheap to clone — everything inside
/// is already an `Arc` or a cheap value.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ControlService>,
    pub events: EventBus,
    pub jwt: Arc<JwtIssuer>,
    pub origins: Arc<OriginAllowList>,
    pub base_domain: String,
    pub certs_dir: PathBuf,
    pub runtime_binary: PathBuf,
    pub home_root: PathBuf,
    pub sentinel_account: String,
    pub db_pool: PgPool,
    /// Unix timestamp of the reconciler's last successful tick, updated by
    /// the daemon's background task (§4.H's `/healthz` supplement).
    pub reconciler_last_tick: Arc<AtomicI64>,
}
