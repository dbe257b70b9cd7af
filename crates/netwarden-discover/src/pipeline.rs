//! Discovery pipeline: candidate generation and the probe fan-out.
//!
//! A cycle probes every host of the local /24 plus the first hosts of
//! a few common private ranges, bounded by a semaphore so the fan-out
//! never floods the network stack.

use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use ipnet::Ipv4Net;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Semaphore;
use uuid::Uuid;

use netwarden_core::config::MonitorConfig;

use crate::error::{DiscoverError, Result};
use crate::{probe, resolve, Observation};

/// Ranges probed in addition to the local subnet.
const EXTRA_RANGES: &[&str] = &[
    "10.0.0.0/24",
    "172.16.0.0/24",
    "192.168.0.0/24",
    "192.168.2.0/24",
    "192.168.3.0/24",
];

/// How many hosts of each extra range to try.
const EXTRA_RANGE_HOSTS: usize = 100;

/// Outcome of one discovery cycle.
#[derive(Debug)]
pub struct CycleResult {
    pub cycle_id: Uuid,
    pub observations: Vec<Observation>,
    pub duration: Duration,
}

pub struct DiscoveryPipeline {
    config: MonitorConfig,
    concurrency: Arc<Semaphore>,
}

impl DiscoveryPipeline {
    pub fn new(config: MonitorConfig) -> Self {
        let concurrency = Arc::new(Semaphore::new(config.probe_concurrency));
        Self {
            config,
            concurrency,
        }
    }

    /// Run one full discovery cycle and return everything that answered.
    pub async fn run_cycle(&self) -> CycleResult {
        let cycle_id = Uuid::new_v4();
        let started = Instant::now();

        let own = match own_subnet().await {
            Ok(net) => Some(net),
            Err(err) => {
                tracing::warn!(
                    cycle_id = %cycle_id,
                    error = %err,
                    "Local subnet unknown, probing default ranges only"
                );
                None
            }
        };
        let candidates = candidate_addresses(own, self.config.scan_limit);

        tracing::debug!(
            cycle_id = %cycle_id,
            candidates = candidates.len(),
            "Discovery cycle started"
        );

        let mut handles = Vec::with_capacity(candidates.len());
        for ip in candidates {
            let permit = self
                .concurrency
                .clone()
                .acquire_owned()
                .await
                .expect("Semaphore closed");
            let ping_timeout = self.config.ping_timeout_ms;
            let port_timeout = self.config.port_probe_timeout_ms;
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                probe_candidate(ip, ping_timeout, port_timeout).await
            }));
        }

        let mut observations = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(obs)) => observations.push(obs),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(cycle_id = %cycle_id, error = %err, "Probe task panicked");
                }
            }
        }

        CycleResult {
            cycle_id,
            observations,
            duration: started.elapsed(),
        }
    }
}

/// Probe one address: reachability, then neighbor MAC, then hostname.
async fn probe_candidate(
    ip: Ipv4Addr,
    ping_timeout_ms: u64,
    port_timeout_ms: u64,
) -> Option<Observation> {
    if !probe::is_reachable(ip, ping_timeout_ms, port_timeout_ms).await {
        return None;
    }

    let mac = match probe::neighbor_mac(ip).await {
        Some(mac) => mac,
        None => {
            tracing::debug!(ip = %ip, "Reachable host without a usable neighbor entry");
            return None;
        }
    };

    let hostname = resolve::hostname(ip, port_timeout_ms).await;
    Some(Observation { mac, ip, hostname })
}

/// Detect the local /24: the default-route gateway first, then the
/// first private address reported by `hostname -I`.
pub async fn own_subnet() -> Result<Ipv4Net> {
    let route = Command::new("ip")
        .args(["route", "show", "default"])
        .output()
        .await?;
    if route.status.success() {
        if let Some(gateway) = parse_default_route(&String::from_utf8_lossy(&route.stdout)) {
            return subnet_of(gateway);
        }
    }

    let addrs = Command::new("hostname").arg("-I").output().await?;
    if addrs.status.success() {
        if let Some(ip) = first_private_address(&String::from_utf8_lossy(&addrs.stdout)) {
            return subnet_of(ip);
        }
    }

    Err(DiscoverError::Subnet {
        reason: "no default route or private interface address".to_string(),
    })
}

/// `default via <gateway> dev <iface> ...`
fn parse_default_route(output: &str) -> Option<Ipv4Addr> {
    for line in output.lines() {
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            if token == "via" {
                if let Some(ip) = tokens.next().and_then(|raw| raw.parse().ok()) {
                    return Some(ip);
                }
            }
        }
    }
    None
}

fn first_private_address(output: &str) -> Option<Ipv4Addr> {
    output
        .split_whitespace()
        .filter_map(|token| token.parse::<Ipv4Addr>().ok())
        .find(Ipv4Addr::is_private)
}

fn subnet_of(ip: Ipv4Addr) -> Result<Ipv4Net> {
    let [a, b, c, _] = ip.octets();
    Ipv4Net::new(Ipv4Addr::new(a, b, c, 0), 24).map_err(|err| DiscoverError::Subnet {
        reason: err.to_string(),
    })
}

/// Candidate addresses for one cycle: every host of the local /24,
/// then the first `EXTRA_RANGE_HOSTS` of each extra range. An extra
/// range equal to the local subnet is skipped, and the whole list is
/// capped at `scan_limit`.
fn candidate_addresses(own: Option<Ipv4Net>, scan_limit: usize) -> Vec<Ipv4Addr> {
    let mut candidates: Vec<Ipv4Addr> = Vec::new();

    if let Some(net) = own {
        candidates.extend(net.hosts());
    }

    for net in EXTRA_RANGES.iter().filter_map(|raw| raw.parse::<Ipv4Net>().ok()) {
        if Some(net) == own {
            continue;
        }
        candidates.extend(net.hosts().take(EXTRA_RANGE_HOSTS));
    }

    candidates.truncate(scan_limit);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_dedup_own_subnet() {
        let own: Ipv4Net = "192.168.0.0/24".parse().unwrap();
        let candidates = candidate_addresses(Some(own), 10_000);

        // 254 local hosts plus four extra ranges; the extras entry that
        // matches the local subnet collapses into it.
        assert_eq!(candidates.len(), 254 + 4 * EXTRA_RANGE_HOSTS);
        let unique: std::collections::HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn candidates_start_with_own_subnet() {
        let own: Ipv4Net = "192.168.7.0/24".parse().unwrap();
        let candidates = candidate_addresses(Some(own), 10_000);
        assert_eq!(candidates[0], Ipv4Addr::new(192, 168, 7, 1));
        assert_eq!(candidates.len(), 254 + 5 * EXTRA_RANGE_HOSTS);
    }

    #[test]
    fn candidates_respect_scan_limit() {
        let own: Ipv4Net = "192.168.7.0/24".parse().unwrap();
        let candidates = candidate_addresses(Some(own), 10);
        assert_eq!(candidates.len(), 10);
    }

    #[test]
    fn candidates_without_own_subnet_use_extras() {
        let candidates = candidate_addresses(None, 10_000);
        assert_eq!(candidates.len(), 5 * EXTRA_RANGE_HOSTS);
        assert_eq!(candidates[0], Ipv4Addr::new(10, 0, 0, 1));
    }

    #[test]
    fn default_route_gateway_is_parsed() {
        let output = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n";
        assert_eq!(
            parse_default_route(output),
            Some(Ipv4Addr::new(192, 168, 1, 1))
        );
        assert_eq!(parse_default_route(""), None);
    }

    #[test]
    fn first_private_address_skips_public() {
        let output = "203.0.113.7 192.168.1.23 \n";
        assert_eq!(
            first_private_address(output),
            Some(Ipv4Addr::new(192, 168, 1, 23))
        );
        assert_eq!(first_private_address("203.0.113.7\n"), None);
    }

    #[test]
    fn subnet_of_masks_to_slash_24() {
        let net = subnet_of(Ipv4Addr::new(192, 168, 1, 77)).unwrap();
        assert_eq!(net, "192.168.1.0/24".parse().unwrap());
    }
}
