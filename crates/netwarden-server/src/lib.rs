//! netwarden-server: Command protocol server for the NetWarden monitor.
//!
//! Accepts client connections over plain TCP and optionally TLS, speaks
//! the line protocol (LIST, ALLOWLIST, ADD, DEL, STATUS, QUIT), and
//! serves state from the shared allowlist store and device registry.

pub mod commands;
pub mod context;
pub mod error;
pub mod handler;
pub mod listener;
pub mod tls;

pub use error::{Result, ServerError};
