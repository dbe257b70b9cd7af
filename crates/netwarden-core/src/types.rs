//! Core domain types for NetWarden.
//!
//! Devices are keyed by MAC address throughout the system: the registry of
//! observed devices, the durable allowlist, and the wire protocol all speak
//! the canonical uppercase-colon form produced by [`MacAddr`].

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WardenError};

/// Placeholder hostname used when no resolution strategy produced a name.
pub const UNKNOWN_HOSTNAME: &str = "Unknown";

// ── MAC address ───────────────────────────────────────────────────

/// A six-byte hardware address, the identity key for every device.
///
/// Parses from colon- or hyphen-separated hex pairs in any case and always
/// renders as uppercase colon-separated form, so normalization is
/// `parse` followed by `to_string` and is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Group bit set: multicast (and broadcast) addresses never identify a
    /// single device.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl FromStr for MacAddr {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || WardenError::InvalidMac {
            input: s.to_string(),
        };

        // Six hex pairs plus five single-char separators.
        if !s.is_ascii() || s.len() != 17 {
            return Err(invalid());
        }

        let bytes = s.as_bytes();
        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            let off = i * 3;
            *octet = u8::from_str_radix(&s[off..off + 2], 16).map_err(|_| invalid())?;
            if i < 5 && bytes[off + 2] != b':' && bytes[off + 2] != b'-' {
                return Err(invalid());
            }
        }
        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl TryFrom<String> for MacAddr {
    type Error = WardenError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

/// Parse a dotted-quad IPv4 address, mapping failures to a field-level error.
pub fn parse_ipv4(s: &str) -> Result<Ipv4Addr> {
    s.trim().parse().map_err(|_| WardenError::InvalidIp {
        input: s.to_string(),
    })
}

// ── Device records ────────────────────────────────────────────────

/// A device as currently observed on the network.
///
/// `known` is derived from allowlist membership and recomputed on every
/// sighting and reclassification; it is never authoritative on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub mac: MacAddr,
    pub ip: Option<Ipv4Addr>,
    pub hostname: String,
    pub known: bool,
    pub last_seen: DateTime<Utc>,
}

impl DeviceRecord {
    pub fn new(mac: MacAddr, ip: Option<Ipv4Addr>, hostname: impl Into<String>, known: bool) -> Self {
        Self {
            mac,
            ip,
            hostname: non_empty_hostname(hostname.into()),
            known,
            last_seen: Utc::now(),
        }
    }
}

/// A durable allowlist entry. Devices listed here are "known".
///
/// `added_at` is in-memory bookkeeping only: the line format carries no
/// timestamp, so it resets to load time across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub mac: MacAddr,
    pub hostname: String,
    pub ip: Option<Ipv4Addr>,
    #[serde(default = "Utc::now")]
    pub added_at: DateTime<Utc>,
}

impl AllowlistEntry {
    pub fn new(mac: MacAddr, hostname: Option<&str>, ip: Option<Ipv4Addr>) -> Self {
        Self {
            mac,
            hostname: non_empty_hostname(hostname.unwrap_or(UNKNOWN_HOSTNAME).to_string()),
            ip,
            added_at: Utc::now(),
        }
    }

    /// View this entry as a device record for wire responses.
    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            mac: self.mac,
            ip: self.ip,
            hostname: self.hostname.clone(),
            known: true,
            last_seen: self.added_at,
        }
    }
}

fn non_empty_hostname(hostname: String) -> String {
    if hostname.trim().is_empty() {
        UNKNOWN_HOSTNAME.to_string()
    } else {
        hostname
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parses_colon_and_hyphen_forms() {
        let colon: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let hyphen: MacAddr = "AA-BB-CC-DD-EE-FF".parse().unwrap();
        assert_eq!(colon, hyphen);
        assert_eq!(colon.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn mac_normalization_is_idempotent() {
        for input in ["00:1a:2b:3c:4d:5e", "00-1A-2B-3C-4D-5E", "FF:ff:Ff:fF:00:99"] {
            let once = input.parse::<MacAddr>().unwrap().to_string();
            let twice = once.parse::<MacAddr>().unwrap().to_string();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn mac_rejects_malformed_input() {
        for input in [
            "",
            "not-a-mac",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa:bb:cc:dd:ee:fg",
            "aabb.ccdd.eeff",
            "aa:bb:cc:dd:ee:f",
        ] {
            assert!(input.parse::<MacAddr>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn mac_serde_uses_canonical_string() {
        let mac: MacAddr = "a1-b2-c3-d4-e5-f6".parse().unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"A1:B2:C3:D4:E5:F6\"");

        let back: MacAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn broadcast_and_multicast_flags() {
        assert!(MacAddr::BROADCAST.is_broadcast());
        assert!(MacAddr::BROADCAST.is_multicast());

        let multicast: MacAddr = "01:00:5E:00:00:01".parse().unwrap();
        assert!(multicast.is_multicast());
        assert!(!multicast.is_broadcast());

        let unicast: MacAddr = "00:11:22:33:44:55".parse().unwrap();
        assert!(!unicast.is_multicast());
    }

    #[test]
    fn parse_ipv4_accepts_dotted_quad_only() {
        assert_eq!(
            parse_ipv4("192.168.1.50").unwrap(),
            Ipv4Addr::new(192, 168, 1, 50)
        );
        assert!(parse_ipv4("192.168.1").is_err());
        assert!(parse_ipv4("192.168.1.256").is_err());
        assert!(parse_ipv4("fe80::1").is_err());
    }

    #[test]
    fn empty_hostname_falls_back_to_placeholder() {
        let mac: MacAddr = "00:11:22:33:44:55".parse().unwrap();
        let record = DeviceRecord::new(mac, None, "  ", false);
        assert_eq!(record.hostname, UNKNOWN_HOSTNAME);

        let entry = AllowlistEntry::new(mac, Some(""), None);
        assert_eq!(entry.hostname, UNKNOWN_HOSTNAME);
    }

    #[test]
    fn allowlist_entry_views_as_known_record() {
        let mac: MacAddr = "00:11:22:33:44:55".parse().unwrap();
        let entry = AllowlistEntry::new(mac, Some("printer"), Some(Ipv4Addr::new(10, 0, 0, 9)));
        let record = entry.to_record();
        assert!(record.known);
        assert_eq!(record.hostname, "printer");
        assert_eq!(record.last_seen, entry.added_at);
    }
}
