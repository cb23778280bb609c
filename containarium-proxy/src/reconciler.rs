use std::collections::HashSet;
use std::time::Duration;

use containarium_core::domain::{L4Protocol, Route};
use containarium_core::CancellationToken;
use containarium_data::{PassthroughRepository, RouteRepository};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::admin::ProxyAdminClient;
use crate::error::ProxyError;
use crate::packet::PacketTables;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// `(external_port, protocol, target_ip, target_port)` — the exact tuple
/// a passthrough rule was installed with, so a target change on an
/// otherwise-unchanged `(external_port, protocol)` key is a remove-old +
/// add-new rather than a no-op.
type PassthroughKey = (u16, L4Protocol, String, u16);

/// Converges the reverse proxy and kernel packet tables onto the Route
/// Store (§4.F). The HTTP half holds no state between ticks — the proxy's
/// admin API is itself queryable, so every tick re-reads both desired and
/// observed sets from scratch. The packet-table half has no such
/// queryable observed set (no clean kernel equivalent to `GET /routes`),
/// so it remembers the set of rules it applied last tick in
/// `applied_passthrough` purely to know what to remove; `PacketTables`
/// itself makes re-applying an already-installed rule a no-op via
/// `iptables -C`, so a missed or duplicated tick is still harmless.
pub struct RouteReconciler {
    routes: RouteRepository,
    passthrough: PassthroughRepository,
    admin: ProxyAdminClient,
    packet_tables: PacketTables,
    base_domain: String,
    tick_interval: Duration,
    applied_passthrough: Mutex<HashSet<PassthroughKey>>,
}

impl RouteReconciler {
    pub fn new(
        routes: RouteRepository,
        passthrough: PassthroughRepository,
        admin: ProxyAdminClient,
        packet_tables: PacketTables,
        base_domain: impl Into<String>,
    ) -> Self {
        RouteReconciler {
            routes,
            passthrough,
            admin,
            packet_tables,
            base_domain: base_domain.into(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            applied_passthrough: Mutex::new(HashSet::new()),
        }
    }

    pub async fn run(&self, cancellation: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => {
                    info!("route reconciler shutting down");
                    return;
                }
                _ = tokio::time::sleep(self.tick_interval) => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "reconciler tick failed, will retry next tick");
                    }
                }
            }
        }
    }

    pub async fn tick(&self) -> Result<(), ProxyError> {
        self.reconcile_http().await?;
        self.reconcile_passthrough().await?;
        Ok(())
    }

    async fn reconcile_http(&self) -> Result<(), ProxyError> {
        let desired = self.routes.list().await?;
        let observed = self.admin.list_routes().await?;

        let observed_hosts: HashSet<String> = observed.iter().map(|r| r.host.clone()).collect();
        let desired_hosts: HashSet<String> = desired
            .iter()
            .map(|r| r.host(&self.base_domain))
            .collect();

        // Additions before removals to avoid a gap where a host briefly
        // resolves to nothing (§4.F step 4).
        for route in &desired {
            let host = route.host(&self.base_domain);
            if !observed_hosts.contains(&host) {
                self.install_route(route, &host).await?;
            }
        }

        for observed_route in &observed {
            if !desired_hosts.contains(&observed_route.host) {
                self.admin.delete_route(&observed_route.host).await?;
                info!(host = %observed_route.host, "removed stale proxy route");
            }
        }

        Ok(())
    }

    async fn install_route(&self, route: &Route, host: &str) -> Result<(), ProxyError> {
        self.admin
            .upsert_route(
                host,
                &route.target_ip,
                route.target_port,
                matches!(route.protocol, containarium_core::domain::HttpProtocol::Grpc),
            )
            .await?;

        // TLS issuance failure is non-fatal — the route is still
        // installed, possibly behind an existing wildcard cert (§4.F).
        if let Err(err) = self.admin.extend_tls_policy(host).await {
            warn!(host, error = %err, "TLS policy extension failed, route still installed");
        }

        info!(host, "installed proxy route");
        Ok(())
    }

    async fn reconcile_passthrough(&self) -> Result<(), ProxyError> {
        let desired = self.passthrough.list().await?;
        let desired_keys: HashSet<PassthroughKey> = desired
            .iter()
            .map(|r| (r.external_port, r.protocol, r.target_ip.clone(), r.target_port))
            .collect();

        let mut applied = self.applied_passthrough.lock().await;

        // Additions before removals, same ordering rationale as the HTTP
        // half (§4.F step 4). `add_rule` checks `-C` before `-A`, so this
        // is a no-op for every route already installed; `applied` is
        // updated as each one succeeds so a failure partway through
        // leaves it consistent with actual kernel state for the retry.
        for route in &desired {
            let key = (route.external_port, route.protocol, route.target_ip.clone(), route.target_port);
            self.packet_tables
                .add_rule(route.external_port, route.protocol, &route.target_ip, route.target_port)
                .await?;
            applied.insert(key);
        }

        // §4.F step 3: remove = O \ D. The kernel exposes no queryable O,
        // so O here is "what we've applied since this process started"
        // rather than a live read — a route deleted from the store while
        // this process was down won't be cleaned up until it's observed
        // missing from D by a process that had it in its own `applied`.
        let stale: Vec<PassthroughKey> = applied.difference(&desired_keys).cloned().collect();
        for key in stale {
            let (external_port, protocol, target_ip, target_port) = key.clone();
            self.packet_tables
                .remove_rule(external_port, protocol, &target_ip, target_port)
                .await?;
            applied.remove(&key);
            info!(external_port, ?protocol, target_ip = %target_ip, target_port, "removed stale passthrough rule");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_host_rule_matches_route_domain() {
        // Regression guard for the churn bug called out in §4.F/§8: an
        // FQDN route must never get base_domain appended.
        let host = Route::canonical_host("api.acme.app", "api", "example.com");
        assert_eq!(host, "api.acme.app");
    }

    #[test]
    fn bare_label_route_gets_base_domain_suffix() {
        let host = Route::canonical_host("alice-api", "alice-api", "example.com");
        assert_eq!(host, "alice-api.example.com");
    }

    #[test]
    fn l4_protocol_pair_is_a_stable_diff_key() {
        let a = (8080u16, L4Protocol::Tcp);
        let b = (8080u16, L4Protocol::Udp);
        assert_ne!(a, b);
    }
}
