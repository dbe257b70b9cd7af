//! Allowlist storage: in-memory map with write-through persistence.
//!
//! The file format is one `MAC,HOSTNAME,IP` entry per line, with `#`
//! comment lines and blank lines ignored. Every mutation rewrites the
//! whole file while holding the write lock and rolls the map back if
//! the rewrite fails, so the in-memory view never drifts from the
//! durable copy.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use parking_lot::RwLock;

use netwarden_core::types::{parse_ipv4, AllowlistEntry, MacAddr};

/// Errors that can occur during allowlist storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Counters from one load pass over the allowlist file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries accepted into the store.
    pub loaded: usize,
    /// Lines with an unparseable MAC or IP.
    pub skipped_malformed: usize,
    /// Lines repeating a MAC already loaded (first occurrence wins).
    pub skipped_duplicate: usize,
}

/// File-backed device allowlist.
///
/// Loaded to memory on startup; every successful mutation is written
/// back immediately. MACs are normalized at parse time, so lookups are
/// case- and separator-insensitive.
pub struct AllowlistStore {
    path: PathBuf,
    entries: RwLock<HashMap<MacAddr, AllowlistEntry>>,
}

impl AllowlistStore {
    /// Open the allowlist at `path`, loading any existing entries.
    /// A missing file is an empty store; the file is created on the
    /// first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<(Self, LoadSummary), StoreError> {
        let path = path.into();
        let mut entries = HashMap::new();
        let mut summary = LoadSummary::default();

        match fs::read_to_string(&path) {
            Ok(text) => {
                for raw in text.lines() {
                    let line = raw.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    match parse_entry(line) {
                        Some(entry) => {
                            if entries.contains_key(&entry.mac) {
                                summary.skipped_duplicate += 1;
                                tracing::warn!(mac = %entry.mac, "Skipping duplicate allowlist entry");
                            } else {
                                entries.insert(entry.mac, entry);
                                summary.loaded += 1;
                            }
                        }
                        None => {
                            summary.skipped_malformed += 1;
                            tracing::warn!(line, "Skipping malformed allowlist line");
                        }
                    }
                }
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        tracing::info!(
            loaded = summary.loaded,
            skipped_malformed = summary.skipped_malformed,
            skipped_duplicate = summary.skipped_duplicate,
            path = %path.display(),
            "Allowlist loaded"
        );

        Ok((
            Self {
                path,
                entries: RwLock::new(entries),
            },
            summary,
        ))
    }

    /// Add a device to the allowlist. Returns `Ok(false)` if the MAC
    /// is already present; the file is rewritten only when the set
    /// actually changes.
    pub fn add(&self, entry: AllowlistEntry) -> Result<bool, StoreError> {
        let mac = entry.mac;
        let added = self.apply(|entries| {
            if entries.contains_key(&mac) {
                return false;
            }
            entries.insert(mac, entry);
            true
        })?;

        if added {
            tracing::info!(mac = %mac, "Device added to allowlist");
        }
        Ok(added)
    }

    /// Remove a device from the allowlist. Returns `Ok(false)` if the
    /// MAC was not present.
    pub fn remove(&self, mac: &MacAddr) -> Result<bool, StoreError> {
        let removed = self.apply(|entries| entries.remove(mac).is_some())?;

        if removed {
            tracing::info!(mac = %mac, "Device removed from allowlist");
        }
        Ok(removed)
    }

    /// Whether a MAC is on the allowlist.
    pub fn contains(&self, mac: &MacAddr) -> bool {
        self.entries.read().contains_key(mac)
    }

    pub fn get(&self, mac: &MacAddr) -> Option<AllowlistEntry> {
        self.entries.read().get(mac).cloned()
    }

    /// All entries, sorted by MAC.
    pub fn list(&self) -> Vec<AllowlistEntry> {
        let mut entries: Vec<AllowlistEntry> = self.entries.read().values().cloned().collect();
        entries.sort_by_key(|entry| entry.mac.octets());
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a mutation against the map, then persist. The write lock is
    /// held across mutate, rewrite, and rollback: if the rewrite fails,
    /// the map is restored from a snapshot taken before the mutation
    /// and no other caller observes the intermediate state.
    fn apply<F>(&self, mutate: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut HashMap<MacAddr, AllowlistEntry>) -> bool,
    {
        let mut entries = self.entries.write();
        let snapshot = entries.clone();

        if !mutate(&mut entries) {
            return Ok(false);
        }

        if let Err(err) = rewrite(&self.path, &entries) {
            *entries = snapshot;
            return Err(err.into());
        }
        Ok(true)
    }
}

/// Parse one `MAC,HOSTNAME,IP` line. The MAC is required; hostname
/// defaults to `Unknown` and the IP may be empty. A line with an
/// unparseable MAC or non-empty unparseable IP is malformed.
fn parse_entry(line: &str) -> Option<AllowlistEntry> {
    let mut fields = line.splitn(3, ',');
    let mac: MacAddr = fields.next()?.trim().parse().ok()?;
    let hostname = fields.next().map(str::trim).filter(|h| !h.is_empty());
    let ip = match fields.next().map(str::trim).filter(|f| !f.is_empty()) {
        Some(raw) => Some(parse_ipv4(raw).ok()?),
        None => None,
    };
    Some(AllowlistEntry::new(mac, hostname, ip))
}

/// Render the full file: comment header, blank line, then one
/// `MAC,HOSTNAME,IP` line per entry sorted by MAC.
fn render(entries: &HashMap<MacAddr, AllowlistEntry>) -> String {
    let mut out = String::from("# NetWarden allowlist - format: MAC,HOSTNAME,IP\n");
    out.push_str(&format!(
        "# Generated: {}\n\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    ));

    let mut sorted: Vec<&AllowlistEntry> = entries.values().collect();
    sorted.sort_by_key(|entry| entry.mac.octets());
    for entry in sorted {
        let ip = entry.ip.map(|ip| ip.to_string()).unwrap_or_default();
        out.push_str(&format!("{},{},{}\n", entry.mac, entry.hostname, ip));
    }
    out
}

fn rewrite(path: &Path, entries: &HashMap<MacAddr, AllowlistEntry>) -> io::Result<()> {
    fs::write(path, render(entries))?;
    tracing::debug!(count = entries.len(), path = %path.display(), "Allowlist saved");
    Ok(())
}
