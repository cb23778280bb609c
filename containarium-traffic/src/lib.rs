//! Traffic Collector (§4.M): samples connection-tracking data on an
//! interval, resolves source/destination IPs to container names via a
//! cache kept current off the event bus, and persists + republishes the
//! aggregates.

pub mod cache;
pub mod collector;
pub mod conntrack;

pub use cache::IpNameCache;
pub use collector::{TrafficCollector, DEFAULT_TICK_INTERVAL};
pub use conntrack::{parse_conntrack_table, Counters};
