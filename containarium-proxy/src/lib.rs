//! Route Reconciler (§4.F): converges the reverse proxy's admin API and
//! the kernel packet-forwarding tables onto the authoritative Route Store.

pub mod admin;
pub mod error;
pub mod packet;
pub mod reconciler;

pub use admin::{ObservedRoute, ProxyAdminClient};
pub use error::ProxyError;
pub use packet::PacketTables;
pub use reconciler::{RouteReconciler, DEFAULT_TICK_INTERVAL};
