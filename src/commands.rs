use std::path::Path;

use crate::config::load_records;
use crate::device::{DeviceLink, LinkManager, PortCandidate, PushOutcome, VerificationResult};

fn require_port_id(port_id: &str) -> Result<&str, String> {
    let port_id = port_id.trim();
    if port_id.is_empty() {
        Err("Port ID is required".to_string())
    } else {
        Ok(port_id)
    }
}

/// List candidate ports, optionally running the verification handshake on each
pub async fn list_ports(manager: &LinkManager, verify: bool) -> Result<Vec<PortCandidate>, String> {
    let ports = if verify {
        manager.discover_ports().await
    } else {
        manager.list_ports().await
    };

    if ports.is_empty() {
        log::warn!("No serial ports available. Check that the controller is plugged in.");
    }
    Ok(ports)
}

/// Verify one port, bypassing any cached result when `fresh` is set
pub async fn verify_port(
    manager: &LinkManager,
    port_id: &str,
    fresh: bool,
) -> Result<VerificationResult, String> {
    let port_id = require_port_id(port_id)?;
    if fresh {
        manager.clear_verification_cache();
    }
    Ok(manager.verify(port_id).await)
}

/// Check that a port can be opened
pub async fn test_port(manager: &LinkManager, port_id: &str) -> Result<bool, String> {
    let port_id = require_port_id(port_id)?;
    let available = manager.test_port_connection(port_id).await;
    if available {
        log::info!("Port {} is available", port_id);
    } else {
        log::warn!("Port {} is unavailable or busy", port_id);
    }
    Ok(available)
}

/// Push the stored button configuration to the controller
pub async fn send_configuration(
    manager: &LinkManager,
    port_id: &str,
    records_path: &Path,
    await_ack: bool,
) -> Result<PushOutcome, String> {
    let port_id = require_port_id(port_id)?;
    let records = load_records(records_path)
        .map_err(|e| format!("Failed to load button records: {}", e))?;

    let outcome = manager.push_configuration(port_id, &records, await_ack).await;
    if !outcome.connected {
        return Err(format!("Failed to connect to {}", port_id));
    }
    if !outcome.sent {
        return Err(format!("Failed to send configuration to {}", port_id));
    }
    Ok(outcome)
}

/// Send a test ping and report any reply
pub async fn ping_device(manager: &LinkManager, port_id: &str) -> Result<PushOutcome, String> {
    let port_id = require_port_id(port_id)?;
    let outcome = manager.ping(port_id).await;
    if !outcome.connected {
        return Err(format!("Failed to connect to {}", port_id));
    }
    Ok(outcome)
}

/// First verified controller port
pub async fn auto_select_port(manager: &LinkManager) -> Result<Option<String>, String> {
    Ok(manager.auto_select_port().await)
}
