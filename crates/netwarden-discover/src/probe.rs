//! Low-level host probing.
//!
//! Reachability first tries an ICMP echo, which needs raw-socket
//! privilege; when the echo cannot be sent at all the probe falls back
//! to TCP connect attempts on the signature ports. MAC resolution reads
//! the OS neighbor table, which the probe that just ran has primed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::timeout;

use netwarden_core::types::MacAddr;

use crate::resolve::SIGNATURE_PORTS;

/// Whether `ip` answers at all. An echo timeout means the host is down;
/// an echo send error means ICMP is unavailable here and the signature
/// ports decide instead.
pub async fn is_reachable(ip: Ipv4Addr, ping_timeout_ms: u64, port_timeout_ms: u64) -> bool {
    let payload = [0u8; 56];
    match timeout(
        Duration::from_millis(ping_timeout_ms),
        surge_ping::ping(IpAddr::V4(ip), &payload),
    )
    .await
    {
        Ok(Ok(_)) => return true,
        Err(_) => return false,
        Ok(Err(err)) => {
            tracing::debug!(ip = %ip, error = %err, "ICMP unavailable, trying TCP probe");
        }
    }

    for &(port, _) in SIGNATURE_PORTS {
        if port_open(ip, port, port_timeout_ms).await {
            return true;
        }
    }
    false
}

/// TCP connect probe bounded by `timeout_ms`.
pub async fn port_open(ip: Ipv4Addr, port: u16, timeout_ms: u64) -> bool {
    let addr = SocketAddr::from((ip, port));
    matches!(
        timeout(Duration::from_millis(timeout_ms), TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Resolve a MAC through the OS neighbor table: `ip neigh show <ip>`
/// first, `arp -n <ip>` as the fallback. Broadcast and multicast
/// entries are rejected.
pub async fn neighbor_mac(ip: Ipv4Addr) -> Option<MacAddr> {
    let mut mac = None;

    if let Some(output) = command_stdout("ip", &["neigh", "show", &ip.to_string()]).await {
        mac = parse_ip_neigh(&output);
    }
    if mac.is_none() {
        if let Some(output) = command_stdout("arp", &["-n", &ip.to_string()]).await {
            mac = parse_arp(&output, ip);
        }
    }

    mac.filter(|mac| !mac.is_broadcast() && !mac.is_multicast())
}

/// Run a command and capture stdout, treating any failure as no output.
pub(crate) async fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Parse `ip neigh` output: the token after `lladdr` is the MAC.
/// `FAILED` and `INCOMPLETE` entries carry no `lladdr` and fall through.
fn parse_ip_neigh(output: &str) -> Option<MacAddr> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "lladdr" {
                if let Some(mac) = tokens.next().and_then(|raw| raw.parse().ok()) {
                    return Some(mac);
                }
            }
        }
    }
    None
}

/// Parse `arp -n` output. Rows are `address hwtype hwaddress flags iface`;
/// incomplete entries have `(incomplete)` where the type would be and no
/// parseable hardware address.
fn parse_arp(output: &str, ip: Ipv4Addr) -> Option<MacAddr> {
    let needle = ip.to_string();
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 3 && parts[0] == needle {
            if let Ok(mac) = parts[2].parse() {
                return Some(mac);
            }
        }
    }
    None
}
