//! netwarden-discover: LAN device discovery for NetWarden.
//!
//! Probes candidate addresses across the local subnets, resolves MAC and
//! hostname for each responsive host, and maintains the in-memory device
//! registry that the control protocol serves.

pub mod error;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod resolve;
pub mod scheduler;

use std::net::Ipv4Addr;

use netwarden_core::types::MacAddr;

/// One device sighting from a discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub hostname: String,
}
