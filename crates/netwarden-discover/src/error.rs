//! Error types for the netwarden-discover crate.
//!
//! Per-candidate probe failures are not errors: an address that does not
//! answer is simply absent from the cycle's observations. Only subnet
//! detection can fail hard, and the pipeline degrades to the default
//! ranges when it does.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoverError {
    #[error("Local subnet detection failed: {reason}")]
    Subnet { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DiscoverError>;
