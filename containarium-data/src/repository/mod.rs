mod app;
mod collaborator;
mod daemon_config;
mod passthrough;
mod route;
mod traffic;

pub use app::AppRepository;
pub use collaborator::CollaboratorRepository;
pub use daemon_config::DaemonConfigRepository;
pub use passthrough::PassthroughRepository;
pub use route::RouteRepository;
pub use traffic::{TrafficRepository, TrafficSample};
