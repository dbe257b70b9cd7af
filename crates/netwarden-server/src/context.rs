//! Shared server state.
//!
//! One explicit struct handed (as `Arc`) to every connection handler;
//! nothing lives in globals. Counters are plain atomics since they are
//! touched on every connection and command.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use netwarden_core::config::WardenConfig;
use netwarden_discover::registry::DeviceRegistry;
use netwarden_store::AllowlistStore;

pub struct ServerContext {
    pub config: WardenConfig,
    pub store: Arc<AllowlistStore>,
    pub registry: Arc<DeviceRegistry>,
    pub started_at: DateTime<Utc>,
    active_connections: AtomicUsize,
    peak_connections: AtomicUsize,
    total_connections: AtomicU64,
    total_commands: AtomicU64,
}

impl ServerContext {
    pub fn new(
        config: WardenConfig,
        store: Arc<AllowlistStore>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
            started_at: Utc::now(),
            active_connections: AtomicUsize::new(0),
            peak_connections: AtomicUsize::new(0),
            total_connections: AtomicU64::new(0),
            total_commands: AtomicU64::new(0),
        }
    }

    /// Record a newly accepted connection. Returns the active count.
    pub fn connection_opened(&self) -> usize {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        let active = self.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_connections.fetch_max(active, Ordering::Relaxed);
        active
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_executed(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn peak_connections(&self) -> usize {
        self.peak_connections.load(Ordering::Relaxed)
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }

    pub fn total_commands(&self) -> u64 {
        self.total_commands.load(Ordering::Relaxed)
    }

    /// Uptime as `d:hh:mm:ss`.
    pub fn uptime(&self) -> String {
        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0);
        let days = elapsed / 86_400;
        let hours = (elapsed % 86_400) / 3_600;
        let minutes = (elapsed % 3_600) / 60;
        let seconds = elapsed % 60;
        format!("{days}:{hours:02}:{minutes:02}:{seconds:02}")
    }

    /// Counts-only summary for the STATUS data field. Devices count as
    /// active when seen within two poll intervals.
    pub fn status_summary(&self) -> String {
        let window = Duration::seconds((self.config.monitor.poll_interval_secs * 2) as i64);
        format!(
            "uptime={} devices={} known={} active={} allowlist={} connections={} total_connections={} total_commands={}",
            self.uptime(),
            self.registry.len(),
            self.registry.known_count(),
            self.registry.active_count(window),
            self.store.len(),
            self.active_connections(),
            self.total_connections(),
            self.total_commands(),
        )
    }
}
