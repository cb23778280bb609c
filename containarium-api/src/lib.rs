//! API Server (§4.H): a single [`ControlService`] implementation exposed
//! over both a REST/SSE/WebSocket surface (axum) and a gRPC surface
//! (tonic) — the two never duplicate business logic, only request/response
//! mapping and error translation.

pub mod auth;
pub mod certs;
pub mod error;
pub mod grpc;
pub mod keys;
pub mod rest;
pub mod service;
pub mod sse;
pub mod state;
pub mod ws;

pub use error::{to_tonic_status, ApiErrorResponse};
pub use grpc::{proto, GrpcControlService};
pub use rest::router;
pub use service::{ControlService, CreateContainerParams, ListContainersFilter};
pub use state::ApiState;
