//! Controller stand-in that answers the wire protocol over a serial port.
//! Useful with a virtual serial pair when no hardware is attached.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{json, Value};

use crate::serial::protocol::decode_line;
use crate::serial::{PortBackend, Result};
use crate::settings::LinkSettings;

/// Reply line (without newline) for one received line, if any
pub fn reply_for(line: &str) -> Option<String> {
    let message: Value = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(_) => {
            log::warn!("Invalid JSON message: {}", line);
            return None;
        }
    };

    let reply = match message.get("type").and_then(Value::as_str) {
        Some("ping") => {
            log::info!(
                "Ping: {}",
                message.get("message").and_then(Value::as_str).unwrap_or("N/A")
            );
            json!({
                "type": "response",
                "status": "ok",
                "message": "MIDI device active",
            })
        }
        Some("set_config") => {
            let switches = message
                .get("switches")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for switch in switches {
                log::info!(
                    "  Switch {}: {} (CC{}, value {}) {}",
                    switch.get("id").and_then(Value::as_u64).map(|id| id + 1).unwrap_or_default(),
                    switch.get("name").and_then(Value::as_str).unwrap_or("N/A"),
                    switch.get("cc").and_then(Value::as_u64).unwrap_or_default(),
                    switch.get("value").and_then(Value::as_u64).unwrap_or_default(),
                    if switch.get("enabled").and_then(Value::as_bool).unwrap_or(false) {
                        "enabled"
                    } else {
                        "disabled"
                    },
                );
            }
            json!({
                "type": "config_ack",
                "status": "success",
                "message": format!("Configuration received for {} switches", switches.len()),
            })
        }
        other => {
            log::warn!("Unknown message type: {:?}", other);
            return None;
        }
    };

    Some(reply.to_string())
}

/// Serve the protocol on `port_id` until `running` is cleared
pub fn run(
    backend: Arc<dyn PortBackend>,
    port_id: &str,
    settings: &LinkSettings,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut port = backend.open(port_id, settings.baud_rate, settings.read_timeout())?;
    log::info!("Device simulator listening on {}", port_id);

    while running.load(Ordering::Relaxed) {
        let Some(raw) = port.read_line()? else {
            continue;
        };

        let line = match decode_line(&raw) {
            Ok(line) if !line.is_empty() => line,
            Ok(_) => continue,
            Err(e) => {
                log::warn!("{}", e);
                continue;
            }
        };

        if let Some(reply) = reply_for(&line) {
            port.write_all(format!("{}\n", reply).as_bytes())?;
            port.flush()?;
            log::debug!("Replied: {}", reply);
        }
    }

    log::info!("Device simulator stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_gets_a_verification_response() {
        let reply = reply_for(r#"{"type":"ping","timestamp":"2024-05-01T10:00:00Z"}"#).unwrap();
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "response");
        assert_eq!(value["status"], "ok");
    }

    #[test]
    fn set_config_is_acknowledged_with_switch_count() {
        let config = crate::config::encode(&[]);
        let line = serde_json::to_string(&crate::serial::DeviceMessage::from(config)).unwrap();
        let reply = reply_for(&line).unwrap();
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], "config_ack");
        assert_eq!(value["message"], "Configuration received for 6 switches");
    }

    #[test]
    fn unknown_or_malformed_lines_get_no_reply() {
        assert_eq!(reply_for(r#"{"type":"reboot"}"#), None);
        assert_eq!(reply_for("{not json"), None);
    }
}
