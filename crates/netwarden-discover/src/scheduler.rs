//! Periodic monitor loop.
//!
//! Cycles are awaited inline, so they never overlap; ticks that fire
//! while a cycle is still running are skipped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use netwarden_core::config::MonitorConfig;

use crate::pipeline::DiscoveryPipeline;
use crate::registry::{DeviceRegistry, UpsertOutcome};

pub struct MonitorScheduler {
    config: MonitorConfig,
    pipeline: Arc<DiscoveryPipeline>,
    registry: Arc<DeviceRegistry>,
}

/// Controls a running monitor loop.
pub struct MonitorHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    grace: Duration,
}

impl MonitorScheduler {
    pub fn new(
        config: MonitorConfig,
        pipeline: Arc<DiscoveryPipeline>,
        registry: Arc<DeviceRegistry>,
    ) -> Self {
        Self {
            config,
            pipeline,
            registry,
        }
    }

    /// Spawn the loop. The first cycle runs immediately.
    pub fn start(self) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let grace = Duration::from_secs(self.config.shutdown_grace_secs);
        tracing::info!(
            poll_interval_secs = self.config.poll_interval_secs,
            "Monitor started"
        );
        let task = tokio::spawn(self.run(stop_rx));
        MonitorHandle {
            stop: stop_tx,
            task,
            grace,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut ticker = time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.cycle().await,
                _ = stop.changed() => {
                    tracing::info!("Monitor loop stopping");
                    break;
                }
            }
        }
    }

    async fn cycle(&self) {
        let result = self.pipeline.run_cycle().await;

        let mut new = 0usize;
        let mut auto_added = 0usize;
        for obs in &result.observations {
            match self.registry.upsert(obs) {
                UpsertOutcome::New { auto_added: added } => {
                    new += 1;
                    if added {
                        auto_added += 1;
                    }
                }
                UpsertOutcome::Refreshed => {}
            }
        }

        self.registry.reclassify();
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.ban_window_secs as i64);
        let evicted = self.registry.evict(cutoff);

        tracing::info!(
            cycle_id = %result.cycle_id,
            observed = result.observations.len(),
            new,
            auto_added,
            evicted,
            duration_ms = result.duration.as_millis() as u64,
            "Monitor cycle complete"
        );
    }
}

impl MonitorHandle {
    /// Signal the loop, then wait up to the grace period for it to
    /// finish the cycle in flight.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        match time::timeout(self.grace, self.task).await {
            Ok(Ok(())) => tracing::info!("Monitor stopped"),
            Ok(Err(err)) => tracing::error!(error = %err, "Monitor task panicked"),
            Err(_) => tracing::warn!("Monitor still busy after grace period, detaching"),
        }
    }
}
