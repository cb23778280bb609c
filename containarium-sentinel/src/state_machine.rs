use std::sync::Arc;

use chrono::{DateTime, Utc};
use containarium_core::CancellationToken;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::certs::CertCache;
use crate::config::SentinelConfig;
use crate::maintenance::serve_maintenance;
use crate::passthrough::PassthroughForwarder;
use crate::probe::probe_target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Proxy,
    Maintenance,
}

/// Snapshot backing the sentinel's own status endpoint (§4.K: "mode, target
/// IP, forwarded ports, preemption counts, last outage duration, and cert
/// sync status").
#[derive(Debug, Clone, Serialize)]
pub struct SentinelStatus {
    pub mode: Mode,
    pub target_ip: String,
    pub forwarded_ports: Vec<String>,
    pub preemption_count: u64,
    pub last_outage_duration_secs: Option<i64>,
    pub cert_sync_ok: bool,
    pub cert_sync_last_at: Option<DateTime<Utc>>,
}

pub struct Sentinel {
    config: SentinelConfig,
    forwarder: PassthroughForwarder,
    certs: Arc<CertCache>,
    status: Arc<RwLock<SentinelStatus>>,
    maintenance_task: RwLock<Option<JoinHandle<()>>>,
}

impl Sentinel {
    pub fn new(config: SentinelConfig, forwarder: PassthroughForwarder, certs: Arc<CertCache>) -> Self {
        let status = SentinelStatus {
            mode: Mode::Proxy,
            target_ip: config.target_ip.clone(),
            forwarded_ports: config.forward_ports.clone(),
            preemption_count: 0,
            last_outage_duration_secs: None,
            cert_sync_ok: false,
            cert_sync_last_at: None,
        };
        Sentinel {
            config,
            forwarder,
            certs,
            status: Arc::new(RwLock::new(status)),
            maintenance_task: RwLock::new(None),
        }
    }

    pub fn status_handle(&self) -> Arc<RwLock<SentinelStatus>> {
        self.status.clone()
    }

    /// The transition loop of §4.K: `PROXY --N consecutive failures--> MAINTENANCE`,
    /// `MAINTENANCE --1 success (+sync certs)--> PROXY`.
    pub async fn run(&self, cancellation: CancellationToken) {
        self.forwarder
            .activate(&self.config.target_ip)
            .await
            .unwrap_or_else(|err| warn!(error = %err, "failed to activate initial passthrough rules"));

        let mut consecutive_failures: u32 = 0;
        let mut outage_started_at: Option<DateTime<Utc>> = None;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(self.config.probe_interval_secs));

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    info!("sentinel shutting down");
                    self.abort_maintenance().await;
                    break;
                }
                _ = interval.tick() => {
                    let healthy = probe_target(&self.config.target_ip, self.config.probe_port).await;
                    let mode = self.status.read().await.mode;

                    if healthy {
                        consecutive_failures = 0;
                        if mode == Mode::Maintenance {
                            self.transition_to_proxy(&mut outage_started_at).await;
                        }
                    } else {
                        consecutive_failures += 1;
                        if mode == Mode::Proxy && consecutive_failures >= self.config.failure_threshold {
                            outage_started_at = Some(Utc::now());
                            self.transition_to_maintenance().await;
                        }
                    }
                }
            }
        }
    }

    async fn transition_to_maintenance(&self) {
        warn!("transitioning PROXY -> MAINTENANCE");
        if let Err(err) = self.forwarder.deactivate(&self.config.target_ip).await {
            warn!(error = %err, "failed to tear down passthrough rules on maintenance transition");
        }
        let addr = self.config.maintenance_addr.clone();
        let certs = self.certs.clone();
        let handle = tokio::spawn(async move {
            if let Err(err) = serve_maintenance(addr, certs).await {
                warn!(error = %err, "maintenance listener exited");
            }
        });
        *self.maintenance_task.write().await = Some(handle);
        self.status.write().await.mode = Mode::Maintenance;
    }

    async fn transition_to_proxy(&self, outage_started_at: &mut Option<DateTime<Utc>>) {
        info!("transitioning MAINTENANCE -> PROXY");
        self.abort_maintenance().await;

        let sync_result = self.certs.sync().await;
        let mut status = self.status.write().await;
        status.cert_sync_ok = sync_result.is_ok();
        status.cert_sync_last_at = Some(Utc::now());
        if let Err(err) = &sync_result {
            warn!(error = %err, "cert sync failed during MAINTENANCE -> PROXY transition");
        }
        status.preemption_count += 1;
        if let Some(started) = outage_started_at.take() {
            status.last_outage_duration_secs = Some((Utc::now() - started).num_seconds());
        }
        status.mode = Mode::Proxy;
        drop(status);

        if let Err(err) = self.forwarder.activate(&self.config.target_ip).await {
            warn!(error = %err, "failed to re-activate passthrough rules on proxy transition");
        }
    }

    async fn abort_maintenance(&self) {
        if let Some(handle) = self.maintenance_task.write().await.take() {
            handle.abort();
        }
    }
}
