//! netwarden-core: Shared types, protocol definitions, and error handling for NetWarden.
//!
//! This crate provides the foundational pieces used across all NetWarden components:
//! - Device identity types (MacAddr, DeviceRecord, AllowlistEntry)
//! - The command table and line tokenizer for the wire protocol
//! - Response values and their canonical wire rendering
//! - The resolved runtime configuration
//! - Common error types

pub mod command;
pub mod config;
pub mod error;
pub mod response;
pub mod types;

pub use error::{Result, WardenError};
