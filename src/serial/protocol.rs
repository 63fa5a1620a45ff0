use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{Result, SerialError};

/// Number of physical switches on the controller
pub const SWITCH_COUNT: usize = 6;
/// MIDI channel every switch transmits on
pub const MIDI_CHANNEL: u8 = 1;

/// Messages sent to the controller, one JSON object per line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceMessage {
    SetConfig(WireConfigMessage),
    Ping(PingMessage),
}

/// Full switch configuration, always six entries ordered by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireConfigMessage {
    pub switches: Vec<SwitchWireEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchWireEntry {
    pub id: u8,
    pub name: String,
    pub channel: u8,
    pub cc: u16,
    pub value: u16,
    pub enabled: bool,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingMessage {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PingMessage {
    /// Verification ping stamped with the current time
    pub fn now() -> Self {
        Self {
            timestamp: timestamp_now(),
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp_now(),
            message: Some(message.into()),
        }
    }
}

impl DeviceMessage {
    /// Compact single-line JSON terminated by exactly one `\n`
    pub fn to_line(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)
            .map_err(|e| SerialError::Decode(format!("Failed to serialize message: {}", e)))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

impl From<WireConfigMessage> for DeviceMessage {
    fn from(config: WireConfigMessage) -> Self {
        DeviceMessage::SetConfig(config)
    }
}

impl From<PingMessage> for DeviceMessage {
    fn from(ping: PingMessage) -> Self {
        DeviceMessage::Ping(ping)
    }
}

/// Decode one received line into trimmed UTF-8 text
pub fn decode_line(raw: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| SerialError::Decode(format!("Invalid UTF-8: {}", e)))?;
    Ok(text.trim().to_string())
}

/// True when the line is a JSON object whose `type` is `"response"`
pub fn is_verification_response(line: &str) -> Result<bool> {
    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|e| SerialError::Decode(format!("Malformed JSON: {}", e)))?;
    Ok(value.get("type").and_then(|t| t.as_str()) == Some("response"))
}

fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
