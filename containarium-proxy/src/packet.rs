use containarium_core::domain::L4Protocol;
use tokio::process::Command;

use crate::error::ProxyError;

fn protocol_str(protocol: L4Protocol) -> &'static str {
    match protocol {
        L4Protocol::Tcp => "tcp",
        L4Protocol::Udp => "udp",
    }
}

/// Kernel packet-forwarding rules for passthrough routes (§6): a
/// `PREROUTING DNAT` excluding the container CIDR from the source match,
/// plus a matching `POSTROUTING MASQUERADE` so containers keep outbound
/// internet through the same port.
pub struct PacketTables {
    container_cidr: String,
}

impl PacketTables {
    pub fn new(container_cidr: impl Into<String>) -> Self {
        PacketTables {
            container_cidr: container_cidr.into(),
        }
    }

    fn dnat_spec(&self, external_port: u16, protocol: L4Protocol, target_ip: &str, target_port: u16) -> Vec<String> {
        vec![
            "!".into(), "-s".into(), self.container_cidr.clone(),
            "-p".into(), protocol_str(protocol).into(), "--dport".into(), external_port.to_string(),
            "-j".into(), "DNAT".into(), "--to-destination".into(), format!("{target_ip}:{target_port}"),
        ]
    }

    fn masquerade_spec(&self, protocol: L4Protocol, target_ip: &str, target_port: u16) -> Vec<String> {
        vec![
            "-p".into(), protocol_str(protocol).into(),
            "-d".into(), target_ip.to_string(), "--dport".into(), target_port.to_string(),
            "-j".into(), "MASQUERADE".into(),
        ]
    }

    /// Installs both rule halves for a passthrough route, skipping any
    /// half already present. Checking with `-C` before `-A` is what makes
    /// a steady-state tick a true no-op on the packet tables (§8) — `-A`
    /// alone would append a duplicate pair every tick.
    pub async fn add_rule(
        &self,
        external_port: u16,
        protocol: L4Protocol,
        target_ip: &str,
        target_port: u16,
    ) -> Result<(), ProxyError> {
        self.apply_if_missing("PREROUTING", &self.dnat_spec(external_port, protocol, target_ip, target_port))
            .await?;
        self.apply_if_missing("POSTROUTING", &self.masquerade_spec(protocol, target_ip, target_port))
            .await
    }

    /// Mirrors `add_rule`'s idempotence: a rule already absent (e.g. a
    /// retry after a prior tick's partial failure) is a no-op rather than
    /// an `iptables -D` error.
    pub async fn remove_rule(
        &self,
        external_port: u16,
        protocol: L4Protocol,
        target_ip: &str,
        target_port: u16,
    ) -> Result<(), ProxyError> {
        self.remove_if_present("PREROUTING", &self.dnat_spec(external_port, protocol, target_ip, target_port))
            .await?;
        self.remove_if_present("POSTROUTING", &self.masquerade_spec(protocol, target_ip, target_port))
            .await
    }

    async fn apply_if_missing(&self, chain: &str, spec: &[String]) -> Result<(), ProxyError> {
        if self.rule_exists(chain, spec).await? {
            return Ok(());
        }
        self.run_iptables("-A", chain, spec).await
    }

    async fn remove_if_present(&self, chain: &str, spec: &[String]) -> Result<(), ProxyError> {
        if !self.rule_exists(chain, spec).await? {
            return Ok(());
        }
        self.run_iptables("-D", chain, spec).await
    }

    /// `iptables -C` exits 0 when the rule is already present and 1 when
    /// it is not — only some other exit code is a genuine command error.
    async fn rule_exists(&self, chain: &str, spec: &[String]) -> Result<bool, ProxyError> {
        let output = Command::new("iptables")
            .args(["-t", "nat", "-C", chain])
            .args(spec)
            .output()
            .await
            .map_err(|e| ProxyError::PacketTable(e.to_string()))?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ProxyError::PacketTable(String::from_utf8_lossy(&output.stderr).to_string())),
        }
    }

    async fn run_iptables(&self, action: &str, chain: &str, spec: &[String]) -> Result<(), ProxyError> {
        let output = Command::new("iptables")
            .args(["-t", "nat", action, chain])
            .args(spec)
            .output()
            .await
            .map_err(|e| ProxyError::PacketTable(e.to_string()))?;
        if !output.status.success() {
            return Err(ProxyError::PacketTable(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }
}
