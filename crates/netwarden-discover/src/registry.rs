//! In-memory device registry.
//!
//! The live view of the network: every device seen in a recent
//! discovery cycle, keyed by MAC, with its allowlist status. Shared
//! between the monitor loop and the connection handlers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use netwarden_core::types::{AllowlistEntry, DeviceRecord, MacAddr};
use netwarden_store::AllowlistStore;

use crate::Observation;

/// What `upsert` did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sighting of this MAC. `auto_added` reports whether the
    /// device was also registered into the allowlist.
    New { auto_added: bool },
    /// Already tracked; ip, hostname and last_seen refreshed.
    Refreshed,
}

pub struct DeviceRegistry {
    devices: RwLock<HashMap<MacAddr, DeviceRecord>>,
    store: Arc<AllowlistStore>,
    auto_add: bool,
}

impl DeviceRegistry {
    pub fn new(store: Arc<AllowlistStore>, auto_add: bool) -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            store,
            auto_add,
        }
    }

    /// Merge one observation into the registry.
    /// Lock order: registry before store, everywhere.
    pub fn upsert(&self, obs: &Observation) -> UpsertOutcome {
        let mut devices = self.devices.write();
        match devices.entry(obs.mac) {
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                record.ip = Some(obs.ip);
                record.hostname = obs.hostname.clone();
                record.known = self.store.contains(&obs.mac);
                record.last_seen = Utc::now();
                UpsertOutcome::Refreshed
            }
            Entry::Vacant(slot) => {
                let mut known = self.store.contains(&obs.mac);
                let mut auto_added = false;
                if !known && self.auto_add {
                    let entry = AllowlistEntry::new(obs.mac, Some(&obs.hostname), Some(obs.ip));
                    match self.store.add(entry) {
                        Ok(added) => {
                            known = true;
                            auto_added = added;
                            if added {
                                tracing::info!(mac = %obs.mac, ip = %obs.ip, "Device auto-added to allowlist");
                            }
                        }
                        Err(err) => {
                            tracing::warn!(mac = %obs.mac, error = %err, "Auto-add failed");
                        }
                    }
                }

                tracing::info!(
                    mac = %obs.mac,
                    ip = %obs.ip,
                    hostname = %obs.hostname,
                    known,
                    "New device observed"
                );
                slot.insert(DeviceRecord::new(obs.mac, Some(obs.ip), obs.hostname.clone(), known));
                UpsertOutcome::New { auto_added }
            }
        }
    }

    /// Recompute `known` for every record against the current allowlist.
    pub fn reclassify(&self) {
        let mut devices = self.devices.write();
        for record in devices.values_mut() {
            record.known = self.store.contains(&record.mac);
        }
    }

    /// Drop records not seen since `cutoff`. Returns the count removed.
    pub fn evict(&self, cutoff: DateTime<Utc>) -> usize {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|_, record| record.last_seen >= cutoff);
        before - devices.len()
    }

    pub fn get(&self, mac: &MacAddr) -> Option<DeviceRecord> {
        self.devices.read().get(mac).cloned()
    }

    /// All records, sorted by MAC.
    pub fn all(&self) -> Vec<DeviceRecord> {
        let mut records: Vec<DeviceRecord> = self.devices.read().values().cloned().collect();
        records.sort_by_key(|record| record.mac.octets());
        records
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Records currently on the allowlist.
    pub fn known_count(&self) -> usize {
        self.devices.read().values().filter(|r| r.known).count()
    }

    /// Records seen within `window` of now.
    pub fn active_count(&self, window: Duration) -> usize {
        let cutoff = Utc::now() - window;
        self.devices
            .read()
            .values()
            .filter(|r| r.last_seen >= cutoff)
            .count()
    }
}
