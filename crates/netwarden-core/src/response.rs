//! Protocol response values and their canonical wire rendering.
//!
//! One logical response per command. On the wire a response is a block of
//! `KEY:value` lines terminated by a line holding only [`FOOTER`], so a
//! response carrying a device list spans multiple physical lines while the
//! client still has an unambiguous end marker.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::command;
use crate::types::DeviceRecord;

/// Terminator line for one wire response.
pub const FOOTER: &str = "END";

/// Outcome tag of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Error,
    InvalidCommand,
    DeviceNotFound,
    DeviceAlreadyExists,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Success => "SUCCESS",
            Status::Error => "ERROR",
            Status::InvalidCommand => "INVALID_COMMAND",
            Status::DeviceNotFound => "DEVICE_NOT_FOUND",
            Status::DeviceAlreadyExists => "DEVICE_ALREADY_EXISTS",
        }
    }
}

/// A single command's result: status, human message, optional device rows,
/// optional opaque data payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    pub data: Option<String>,
    pub devices: Vec<DeviceRecord>,
}

impl Response {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            data: None,
            devices: Vec::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Unknown keyword: the message names the offender and lists what is valid.
    pub fn invalid_command(keyword: &str) -> Self {
        Self::new(
            Status::InvalidCommand,
            format!(
                "Unknown command: {keyword}. Available commands: {}",
                command::command_names()
            ),
        )
    }

    pub fn device_not_found(message: impl Into<String>) -> Self {
        Self::new(Status::DeviceNotFound, message)
    }

    pub fn device_already_exists(message: impl Into<String>) -> Self {
        Self::new(Status::DeviceAlreadyExists, message)
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_devices(mut self, devices: Vec<DeviceRecord>) -> Self {
        self.devices = devices;
        self
    }

    /// Render the canonical wire form, newline-terminated and ending with
    /// the footer line.
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        out.push_str("STATUS:");
        out.push_str(self.status.as_str());
        out.push('\n');

        if !self.message.is_empty() {
            out.push_str("MESSAGE:");
            out.push_str(&escape(&self.message));
            out.push('\n');
        }

        if let Some(data) = self.data.as_deref() {
            if !data.is_empty() {
                out.push_str("DATA:");
                out.push_str(&escape(data));
                out.push('\n');
            }
        }

        if !self.devices.is_empty() {
            out.push_str(&format!("DEVICES:{}\n", self.devices.len()));
            for device in &self.devices {
                out.push_str(&device_line(device));
                out.push('\n');
            }
        }

        out.push_str(FOOTER);
        out.push('\n');
        out
    }

    /// Convenience JSON view of the same value. Not part of the wire
    /// contract; clients that prefer structured output derive it themselves
    /// or use this.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One device row. Fixed-format fields (mac, ip, timestamp) are emitted
/// verbatim; only the free-text hostname needs escaping.
fn device_line(device: &DeviceRecord) -> String {
    format!(
        "MAC:{}|IP:{}|HOSTNAME:{}|KNOWN:{}|LAST_SEEN:{}",
        device.mac,
        device.ip.map(|ip| ip.to_string()).unwrap_or_default(),
        escape(&device.hostname),
        device.known,
        wire_timestamp(device.last_seen),
    )
}

fn wire_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Backslash-escape the characters that carry structure on the wire.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '|' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
