use containarium_core::domain::L4Protocol;
use containarium_proxy::PacketTables;

use crate::error::SentinelError;

/// One `port/proto` entry parsed from `--forward-port` (§4.K: "DNAT all
/// configured ports to the host's current IP").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardedPort {
    pub port: u16,
    pub protocol: L4Protocol,
}

pub fn parse_forward_ports(raw: &[String]) -> Result<Vec<ForwardedPort>, SentinelError> {
    raw.iter().map(|entry| parse_one(entry)).collect()
}

fn parse_one(entry: &str) -> Result<ForwardedPort, SentinelError> {
    let (port_str, proto_str) = entry.split_once('/').unwrap_or((entry, "tcp"));
    let port: u16 = port_str
        .parse()
        .map_err(|_| SentinelError::InvalidForwardPort(entry.to_string()))?;
    let protocol = match proto_str.to_ascii_lowercase().as_str() {
        "tcp" => L4Protocol::Tcp,
        "udp" => L4Protocol::Udp,
        _ => return Err(SentinelError::InvalidForwardPort(entry.to_string())),
    };
    Ok(ForwardedPort { port, protocol })
}

/// Installs/tears down DNAT rules forwarding every configured port to
/// whichever host IP is currently active, re-pointed on every PROXY
/// re-entry (§4.K's transition re-syncs, applied to the packet tables
/// instead of certs).
pub struct PassthroughForwarder {
    tables: PacketTables,
    ports: Vec<ForwardedPort>,
}

impl PassthroughForwarder {
    pub fn new(container_cidr: impl Into<String>, ports: Vec<ForwardedPort>) -> Self {
        PassthroughForwarder {
            tables: PacketTables::new(container_cidr),
            ports,
        }
    }

    pub async fn activate(&self, target_ip: &str) -> Result<(), SentinelError> {
        for fp in &self.ports {
            self.tables
                .add_rule(fp.port, fp.protocol, target_ip, fp.port)
                .await?;
        }
        Ok(())
    }

    pub async fn deactivate(&self, target_ip: &str) -> Result<(), SentinelError> {
        for fp in &self.ports {
            self.tables
                .remove_rule(fp.port, fp.protocol, target_ip, fp.port)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_and_protocol() {
        let ports = parse_forward_ports(&["443/tcp".to_string(), "53/udp".to_string()]).unwrap();
        assert_eq!(
            ports,
            vec![
                ForwardedPort { port: 443, protocol: L4Protocol::Tcp },
                ForwardedPort { port: 53, protocol: L4Protocol::Udp },
            ]
        );
    }

    #[test]
    fn defaults_to_tcp_when_protocol_omitted() {
        let ports = parse_forward_ports(&["8080".to_string()]).unwrap();
        assert_eq!(ports[0].protocol, L4Protocol::Tcp);
    }

    #[test]
    fn rejects_unknown_protocol() {
        assert!(parse_forward_ports(&["80/sctp".to_string()]).is_err());
    }
}
