pub mod interface;
pub mod protocol;

pub use interface::{PortBackend, SerialPortIO, SystemBackend};
pub use protocol::{DeviceMessage, PingMessage, SwitchWireEntry, WireConfigMessage};

use serde::{Deserialize, Serialize};

/// Controller firmware baud rate
pub const BAUD_RATE: u32 = 115200;
/// Baud rate used for plain "can it be opened" probes
pub const PROBE_BAUD_RATE: u32 = 9600;

/// A serial port as reported by the operating system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub device: String,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

impl PortDescriptor {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Failed to open port {port}: {reason}")]
    PortOpen { port: String, reason: String },

    #[error("Write timed out")]
    WriteTimeout,

    #[error("Read timed out")]
    ReadTimeout,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not connected")]
    NotConnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

pub type Result<T> = std::result::Result<T, SerialError>;
