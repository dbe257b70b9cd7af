use thiserror::Error;

/// Top-level error type shared across NetWarden crates.
#[derive(Error, Debug)]
pub enum WardenError {
    #[error("Invalid MAC address: {input}")]
    InvalidMac { input: String },

    #[error("Invalid IPv4 address: {input}")]
    InvalidIp { input: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WardenError>;
