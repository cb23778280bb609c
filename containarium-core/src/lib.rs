//! Domain types, error kinds, and shared primitives for the Containarium
//! control plane.
//!
//! This crate has no I/O of its own — it is the vocabulary every other
//! `containarium-*` crate shares: the entities of §3 (`Container`, `Route`,
//! …), the error kinds of §7 (`ApiError`), and the event envelope of §4.G.

pub mod domain;
pub mod error;
pub mod event;
pub mod validation;

pub use error::ApiError;
pub use event::{Event, EventPayload, ResourceKind};

/// Cancellation token shared by every long-running task and request.
///
/// Re-exported so downstream crates don't need a direct `tokio-util`
/// dependency just to accept one.
pub type CancellationToken = tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use crate::domain::*;
    pub use crate::error::ApiError;
    pub use crate::event::{Event, EventPayload, ResourceKind};
    pub use crate::CancellationToken;
}
