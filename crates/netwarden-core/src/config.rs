//! Resolved runtime configuration for NetWarden.
//!
//! Loaded from `netwarden.toml` sections or `NETWARDEN__` environment
//! variables by the daemon binary; the library crates only ever see this
//! resolved value.

use serde::Deserialize;

use crate::error::{Result, WardenError};

/// Top-level configuration, one field per section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub allowlist: AllowlistConfig,
}

/// Command listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Plain TCP listener port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Listener bind address.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Maximum concurrent client connections.
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,

    /// Idle window per read attempt, in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Idle timeouts tolerated before the connection is closed.
    #[serde(default = "default_max_timeout_retries")]
    pub max_timeout_retries: u32,
}

/// TLS listener settings. Certificate loading happens at the binary edge.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_tls_port")]
    pub port: u16,

    #[serde(default)]
    pub cert_path: String,

    #[serde(default)]
    pub key_path: String,
}

/// Discovery engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between discovery cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Devices unseen for longer than this are evicted from the registry.
    #[serde(default = "default_ban_window")]
    pub ban_window_secs: u64,

    /// Reachability probe timeout, in milliseconds.
    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,

    /// Per-port connect timeout for the hostname heuristic, in milliseconds.
    #[serde(default = "default_port_probe_timeout_ms")]
    pub port_probe_timeout_ms: u64,

    /// Probe worker pool size per cycle.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Maximum candidate addresses per cycle.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: usize,

    /// Auto-register newly discovered devices into the allowlist.
    #[serde(default)]
    pub auto_add: bool,

    /// Bounded wait for an in-flight cycle on shutdown, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

/// Durable allowlist location.
#[derive(Debug, Clone, Deserialize)]
pub struct AllowlistConfig {
    #[serde(default = "default_allowlist_path")]
    pub path: String,
}

impl WardenConfig {
    /// Reject configurations the daemon cannot safely run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(WardenError::Config("server.port must be 1-65535".into()));
        }
        if self.server.max_clients == 0 || self.server.max_clients > 1000 {
            return Err(WardenError::Config(
                "server.max_clients must be 1-1000".into(),
            ));
        }
        if self.server.max_timeout_retries == 0 {
            return Err(WardenError::Config(
                "server.max_timeout_retries must be at least 1".into(),
            ));
        }
        if self.monitor.poll_interval_secs == 0 || self.monitor.poll_interval_secs > 3600 {
            return Err(WardenError::Config(
                "monitor.poll_interval_secs must be 1-3600".into(),
            ));
        }
        if self.monitor.probe_concurrency == 0 {
            return Err(WardenError::Config(
                "monitor.probe_concurrency must be at least 1".into(),
            ));
        }
        if self.tls.enabled {
            if self.tls.port == 0 {
                return Err(WardenError::Config("tls.port must be 1-65535".into()));
            }
            if self.tls.cert_path.is_empty() || self.tls.key_path.is_empty() {
                return Err(WardenError::Config(
                    "tls.cert_path and tls.key_path are required when tls.enabled".into(),
                ));
            }
        }
        if self.allowlist.path.is_empty() {
            return Err(WardenError::Config("allowlist.path must not be empty".into()));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    9099
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_max_clients() -> usize {
    20
}

fn default_read_timeout_ms() -> u64 {
    120_000
}

fn default_max_timeout_retries() -> u32 {
    3
}

fn default_tls_port() -> u16 {
    443
}

fn default_poll_interval() -> u64 {
    5
}

fn default_ban_window() -> u64 {
    600
}

fn default_ping_timeout_ms() -> u64 {
    500
}

fn default_port_probe_timeout_ms() -> u64 {
    300
}

fn default_probe_concurrency() -> usize {
    64
}

fn default_scan_limit() -> usize {
    1000
}

fn default_shutdown_grace() -> u64 {
    5
}

fn default_allowlist_path() -> String {
    "allowlist.txt".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_addr: default_bind_addr(),
            max_clients: default_max_clients(),
            read_timeout_ms: default_read_timeout_ms(),
            max_timeout_retries: default_max_timeout_retries(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            ban_window_secs: default_ban_window(),
            ping_timeout_ms: default_ping_timeout_ms(),
            port_probe_timeout_ms: default_port_probe_timeout_ms(),
            probe_concurrency: default_probe_concurrency(),
            scan_limit: default_scan_limit(),
            auto_add: false,
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

impl Default for AllowlistConfig {
    fn default() -> Self {
        Self {
            path: default_allowlist_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WardenConfig::default();
        assert_eq!(config.server.port, 9099);
        assert_eq!(config.server.max_clients, 20);
        assert_eq!(config.server.read_timeout_ms, 120_000);
        assert_eq!(config.server.max_timeout_retries, 3);
        assert!(!config.tls.enabled);
        assert_eq!(config.tls.port, 443);
        assert_eq!(config.monitor.poll_interval_secs, 5);
        assert_eq!(config.monitor.ban_window_secs, 600);
        assert!(!config.monitor.auto_add);
        assert_eq!(config.allowlist.path, "allowlist.txt");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = WardenConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.monitor.poll_interval_secs = 7200;
        assert!(config.validate().is_err());

        let mut config = WardenConfig::default();
        config.server.max_clients = 5000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_tls_paths_when_enabled() {
        let mut config = WardenConfig::default();
        config.tls.enabled = true;
        assert!(config.validate().is_err());

        config.tls.cert_path = "server.crt".to_string();
        config.tls.key_path = "server.key".to_string();
        assert!(config.validate().is_ok());
    }
}
