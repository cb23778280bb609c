//! In-process pub/sub for the control plane (§4.G).
//!
//! Grounded on the teacher's `SseBroadcaster`/`WsBroadcaster` pattern: a
//! single `tokio::sync::broadcast` channel fans events out to every
//! subscriber. Overflow is handled for free by the channel itself — a
//! lagging receiver's next `recv()` returns `RecvError::Lagged(n)` and
//! resumes at the oldest message still buffered, i.e. the *n* oldest
//! messages it missed are the ones dropped. `Subscription::recv` surfaces
//! this to the caller as a skip rather than hiding it, so an SSE/WS
//! consumer can log it.
//!
//! Delivery is best-effort and per-subscription: each `subscribe()` call
//! gets its own [`Subscription`] with its own filter, independent of every
//! other subscriber's lag.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use containarium_core::{Event, ResourceKind};

const DEFAULT_CAPACITY: usize = 1024;
const MIN_METRICS_INTERVAL_SECS: u64 = 1;
const MAX_METRICS_INTERVAL_SECS: u64 = 60;

/// What a subscriber wants to see (§4.G: "filter (resource types, whether
/// to include metrics, metrics interval 1..60 s)").
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    /// `None` means "all resource kinds".
    pub resource_kinds: Option<HashSet<ResourceKind>>,
    pub include_metrics: bool,
    pub metrics_interval: Duration,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        SubscriptionFilter {
            resource_kinds: None,
            include_metrics: false,
            metrics_interval: Duration::from_secs(5),
        }
    }
}

impl SubscriptionFilter {
    pub fn with_resource_kinds(mut self, kinds: impl IntoIterator<Item = ResourceKind>) -> Self {
        self.resource_kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn with_metrics(mut self, interval_secs: u64) -> Self {
        self.include_metrics = true;
        self.metrics_interval = Duration::from_secs(
            interval_secs.clamp(MIN_METRICS_INTERVAL_SECS, MAX_METRICS_INTERVAL_SECS),
        );
        self
    }

    fn accepts(&self, event: &Event) -> bool {
        if event.resource_kind() == ResourceKind::Traffic && !self.include_metrics {
            return false;
        }
        match &self.resource_kinds {
            None => true,
            Some(kinds) => kinds.contains(&event.resource_kind()),
        }
    }
}

/// Injectable event bus. Clone + Send + Sync.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Publish an event. Returns the number of active subscribers that were
    /// sent the message (a subscriber count of 0 is not an error — nobody's
    /// listening yet, which is normal at startup).
    pub fn publish(&self, event: Event) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                debug!("event published with zero subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        Subscription {
            rx: self.tx.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A single subscriber's view of the bus, already filtered.
pub struct Subscription {
    rx: broadcast::Receiver<Event>,
    filter: SubscriptionFilter,
}

impl Subscription {
    /// Await the next event matching this subscription's filter. Returns
    /// `None` only when the bus itself has been dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if self.filter.accepts(&event) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagged, oldest events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn metrics_interval(&self) -> Duration {
        self.filter.metrics_interval
    }

    pub fn wants_metrics(&self) -> bool {
        self.filter.include_metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use containarium_core::EventPayload;

    fn container_deleted(name: &str) -> Event {
        Event::new(EventPayload::ContainerDeleted { name: name.into() })
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(SubscriptionFilter::default());
        bus.publish(container_deleted("bob-container"));
        let event = sub.recv().await.expect("should receive");
        assert_eq!(event.payload.resource_id(), "bob-container");
    }

    #[tokio::test]
    async fn filter_excludes_other_resource_kinds() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(
            SubscriptionFilter::default().with_resource_kinds([ResourceKind::Route]),
        );
        bus.publish(container_deleted("bob-container"));
        bus.publish(Event::new(EventPayload::RouteDeleted {
            id: uuid::Uuid::new_v4(),
            full_domain: "bob.example.com".into(),
        }));
        let event = sub.recv().await.expect("should receive the route event");
        assert_eq!(event.resource_kind(), ResourceKind::Route);
    }

    #[tokio::test]
    async fn traffic_events_excluded_unless_metrics_requested() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(SubscriptionFilter::default());
        bus.publish(Event::new(EventPayload::TrafficSample {
            container_name: "alice-container".into(),
            rx_bytes: 10,
            tx_bytes: 20,
        }));
        bus.publish(container_deleted("bob-container"));
        let event = sub.recv().await.expect("should skip traffic, get container");
        assert_eq!(event.resource_kind(), ResourceKind::Container);
    }

    #[tokio::test]
    async fn metrics_interval_clamped_to_range() {
        let filter = SubscriptionFilter::default().with_metrics(120);
        assert_eq!(filter.metrics_interval, Duration::from_secs(60));
        let filter = SubscriptionFilter::default().with_metrics(0);
        assert_eq!(filter.metrics_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_get_the_event() {
        let bus = EventBus::new();
        let mut sub1 = bus.subscribe(SubscriptionFilter::default());
        let mut sub2 = bus.subscribe(SubscriptionFilter::default());
        bus.publish(container_deleted("shared"));
        assert_eq!(sub1.recv().await.unwrap().payload.resource_id(), "shared");
        assert_eq!(sub2.recv().await.unwrap().payload.resource_id(), "shared");
    }
}
