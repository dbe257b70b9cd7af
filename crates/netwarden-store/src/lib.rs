//! netwarden-store: durable device allowlist.
//!
//! The allowlist is the operator's record of trusted devices. It lives
//! in a plain text file (one `MAC,HOSTNAME,IP` entry per line) so it can
//! be inspected and edited by hand, and is mirrored in memory for
//! lock-cheap lookups from the monitor and the command handlers.

pub mod store;

pub use store::{AllowlistStore, LoadSummary, StoreError};
