//! Entities of §3, as plain data — persistence and runtime-API mapping live
//! in `containarium-data` and `containarium-runtime` respectively.

mod acl;
mod app;
mod cert;
mod collaborator;
mod container;
mod daemon_config;
mod passthrough;
mod route;

pub use acl::{Acl, AclPreset, AclRule, RuleAction};
pub use app::{App, AppState};
pub use cert::CertificatePair;
pub use collaborator::{Collaborator, ACCOUNT_NAME_MAX_LEN};
pub use container::{
    validate_label_key, Container, ContainerState, ResourceLimits, Role, NAME_MAX_LEN,
    RESERVED_LABEL_PREFIXES,
};
pub use daemon_config::{DaemonConfig, DaemonConfigOverrides};
pub use passthrough::{L4Protocol, PassthroughRoute};
pub use route::{HttpProtocol, Route};
