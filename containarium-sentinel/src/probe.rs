use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A bare TCP connect to the target's probe port; §4.K only requires
/// "a successful probe" to transition MAINTENANCE -> PROXY, not an
/// application-layer health check.
pub async fn probe_target(target_ip: &str, probe_port: u16) -> bool {
    let addr = format!("{target_ip}:{probe_port}");
    matches!(timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await, Ok(Ok(_)))
}
