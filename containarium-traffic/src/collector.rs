use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use containarium_core::{CancellationToken, Event, EventPayload};
use containarium_data::{DataError, TrafficRepository, TrafficSample};
use containarium_events::{EventBus, SubscriptionFilter};
use tracing::{debug, warn};

use crate::cache::IpNameCache;
use crate::conntrack::parse_conntrack_table;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_CONNTRACK_PATH: &str = "/proc/net/nf_conntrack";

/// Traffic Collector (§4.M). Subscribes to the event bus twice: once (via
/// `cache`) to keep the IP→name mapping current as containers come and go,
/// and once as an ordinary reconciler loop that samples connection-tracking
/// data on a fixed interval, resolves each IP to a container name, and
/// persists + republishes the aggregate.
pub struct TrafficCollector {
    events: EventBus,
    repository: TrafficRepository,
    cache: IpNameCache,
    conntrack_path: PathBuf,
    tick_interval: Duration,
}

impl TrafficCollector {
    pub fn new(events: EventBus, repository: TrafficRepository) -> Self {
        TrafficCollector {
            events,
            repository,
            cache: IpNameCache::new(),
            conntrack_path: PathBuf::from(DEFAULT_CONNTRACK_PATH),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_conntrack_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.conntrack_path = path.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub async fn run(&self, cancellation: CancellationToken) {
        let mut container_events = self.events.subscribe(
            SubscriptionFilter::default().with_resource_kinds([containarium_core::ResourceKind::Container]),
        );

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    debug!("traffic collector shutting down");
                    return;
                }
                event = container_events.recv() => {
                    match event {
                        Some(event) => self.cache.apply_event(&event.payload),
                        None => {
                            debug!("event bus closed, traffic collector shutting down");
                            return;
                        }
                    }
                }
                _ = tokio::time::sleep(self.tick_interval) => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "traffic sampling tick failed, will retry next tick");
                    }
                }
            }
        }
    }

    pub async fn tick(&self) -> Result<(), DataError> {
        let text = match tokio::fs::read_to_string(&self.conntrack_path).await {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    path = %self.conntrack_path.display(),
                    error = %err,
                    "could not read connection-tracking table, skipping this tick"
                );
                return Ok(());
            }
        };

        let counters = parse_conntrack_table(&text);
        let sampled_at = Utc::now();

        for (ip, counter) in counters {
            let Some(container_name) = self.cache.name_for(&ip) else {
                continue;
            };

            let sample = TrafficSample {
                container_name: container_name.clone(),
                rx_bytes: counter.rx_bytes,
                tx_bytes: counter.tx_bytes,
                sampled_at,
            };
            self.repository.record(&sample).await?;

            self.events.publish(Event::new(EventPayload::TrafficSample {
                container_name,
                rx_bytes: counter.rx_bytes,
                tx_bytes: counter.tx_bytes,
            }));
        }

        Ok(())
    }
}
