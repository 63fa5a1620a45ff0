use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::serial::{PortBackend, PortDescriptor};
use crate::settings::LinkSettings;

use super::models::PortCandidate;
use super::verifier::DeviceVerifier;

const UNKNOWN_DESCRIPTION: &str = "Unknown Device";
const GENERIC_PRODUCT: &str = "USB Serial Device";
const BRIDGE_VENDORS: [&str; 2] = ["FTDI", "Prolific Technology Inc."];

// USB-serial bridge chipsets and controller boards
const RELEVANT_KEYWORDS: [&str; 19] = [
    "arduino", "midi", "usb", "serial", "ch340", "cp210", "ftdi", "prolific",
    "silicon labs", "atmel", "microchip", "stm32", "esp32", "esp8266", "teensy",
    "leonardo", "uno", "nano", "mega",
];

/// Host family, which decides the device-path fallback rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Unix,
    Windows,
    Other,
}

impl HostPlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            HostPlatform::Windows
        } else if cfg!(unix) {
            HostPlatform::Unix
        } else {
            HostPlatform::Other
        }
    }
}

/// Whether a port could plausibly be the controller
pub fn is_relevant_port(port: &PortDescriptor, platform: HostPlatform) -> bool {
    let combined = format!(
        "{} {} {}",
        port.description.as_deref().unwrap_or(UNKNOWN_DESCRIPTION),
        port.manufacturer.as_deref().unwrap_or_default(),
        port.product.as_deref().unwrap_or_default(),
    )
    .to_lowercase();

    if RELEVANT_KEYWORDS.iter().any(|keyword| combined.contains(keyword)) {
        return true;
    }

    match platform {
        HostPlatform::Unix => {
            let file_name = Path::new(&port.device)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            file_name.starts_with("ttyUSB") || file_name.starts_with("ttyACM")
        }
        HostPlatform::Windows => port.device.to_uppercase().starts_with("COM"),
        HostPlatform::Other => false,
    }
}

/// Human-readable label: device id, the most useful detail, then VID:PID
pub fn friendly_name(port: &PortDescriptor) -> String {
    let mut parts = vec![port.device.clone()];

    let product = non_blank(port.product.as_deref());
    let manufacturer = non_blank(port.manufacturer.as_deref());

    if let Some(product) = product.filter(|p| *p != GENERIC_PRODUCT) {
        parts.push(product.to_string());
    } else if let Some(manufacturer) = manufacturer.filter(|m| !BRIDGE_VENDORS.contains(m)) {
        parts.push(manufacturer.to_string());
    } else if let Some(description) = non_blank(port.description.as_deref()) {
        let cleaned = description
            .replace("USB Serial Port", "")
            .replace("Serial Port", "");
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() && cleaned != port.device && cleaned != UNKNOWN_DESCRIPTION {
            parts.push(cleaned.to_string());
        }
    }

    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        parts.push(format!("(VID:PID {:04X}:{:04X})", vid, pid));
    }

    parts.join(" - ")
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn to_candidate(port: &PortDescriptor) -> PortCandidate {
    PortCandidate {
        id: port.device.clone(),
        name: friendly_name(port),
        description: port
            .description
            .clone()
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
        manufacturer: port.manufacturer.clone().unwrap_or_default(),
        product: port.product.clone().unwrap_or_default(),
        verification: None,
    }
}

/// Enumerates serial ports and keeps the plausible controller candidates
pub struct PortCatalog {
    backend: Arc<dyn PortBackend>,
    platform: HostPlatform,
    probe_baud_rate: u32,
}

impl PortCatalog {
    pub fn new(backend: Arc<dyn PortBackend>, settings: &LinkSettings) -> Self {
        Self {
            backend,
            platform: HostPlatform::current(),
            probe_baud_rate: settings.probe_baud_rate,
        }
    }

    pub fn with_platform(mut self, platform: HostPlatform) -> Self {
        self.platform = platform;
        self
    }

    /// Candidate ports sorted by device id. Enumeration failures yield an empty list.
    pub fn list_ports(&self) -> Vec<PortCandidate> {
        let ports = match self.backend.available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                log::error!("Failed to enumerate serial ports: {}", e);
                return Vec::new();
            }
        };

        let mut candidates: Vec<PortCandidate> = ports
            .iter()
            .filter(|port| {
                let relevant = is_relevant_port(port, self.platform);
                if !relevant {
                    log::debug!("Skipping unrelated port {}", port.device);
                }
                relevant
            })
            .map(to_candidate)
            .collect();

        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        log::info!("Found {} candidate serial ports", candidates.len());
        candidates
    }

    /// Candidates with handshake results, verified controllers first
    pub async fn discover_ports(&self, verifier: &DeviceVerifier) -> Vec<PortCandidate> {
        let mut candidates = self.list_ports();

        for candidate in candidates.iter_mut() {
            let result = verifier.verify(&candidate.id).await;
            log::debug!("Port {}: {:?}", candidate.id, result.status);
            candidate.verification = Some(result);
        }

        candidates.sort_by(|a, b| {
            b.is_midi_device()
                .cmp(&a.is_midi_device())
                .then_with(|| a.id.cmp(&b.id))
        });

        let verified = candidates.iter().filter(|c| c.is_midi_device()).count();
        log::info!("Found {} ports, {} verified controllers", candidates.len(), verified);
        candidates
    }

    /// First verified controller, if any
    pub async fn auto_select_port(&self, verifier: &DeviceVerifier) -> Option<String> {
        self.discover_ports(verifier)
            .await
            .into_iter()
            .find(|c| c.is_midi_device() && c.is_verified())
            .map(|c| c.id)
    }

    /// Open and immediately release the port
    pub fn test_port_connection(&self, port_id: &str, timeout: Duration) -> bool {
        match self.backend.open(port_id, self.probe_baud_rate, timeout) {
            Ok(port) => {
                drop(port);
                true
            }
            Err(e) => {
                log::debug!("Port test for {} failed: {}", port_id, e);
                false
            }
        }
    }
}
