//! Relational persistence for the Containarium control plane (§4.E, §4.J,
//! §4.L, §4.M, §6): routes, passthrough rules, collaborators, apps,
//! daemon config, and traffic history.
//!
//! Each table is owned by exactly one repository; nothing outside this
//! crate writes to them (§5's shared-resource policy). Mutating
//! repositories hold a [`containarium_events::EventBus`] handle and emit
//! on every write, so subscribers never need to poll the datastore.

pub mod error;
pub mod pool;
pub mod repository;

pub use error::DataError;
pub use pool::connect_and_migrate;
pub use repository::{
    AppRepository, CollaboratorRepository, DaemonConfigRepository, PassthroughRepository,
    RouteRepository, TrafficRepository, TrafficSample,
};
