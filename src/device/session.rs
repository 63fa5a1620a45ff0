use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{encode, ButtonRecord};
use crate::serial::protocol::decode_line;
use crate::serial::{DeviceMessage, PingMessage, PortBackend, Result, SerialError, SerialPortIO};
use crate::settings::LinkSettings;

use super::models::LinkState;

const TEST_MESSAGE: &str = "connection test";

/// Owns the connection to at most one controller port.
///
/// Every operation checks [`LinkState`] before touching the handle; sends on a
/// session that is not connected fail without any I/O.
pub struct LinkSession {
    backend: Arc<dyn PortBackend>,
    port: Option<Box<dyn SerialPortIO>>,
    port_id: Option<String>,
    state: LinkState,
    baud_rate: u32,
    timeout: Duration,
}

impl LinkSession {
    pub fn new(backend: Arc<dyn PortBackend>, settings: &LinkSettings) -> Self {
        Self {
            backend,
            port: None,
            port_id: None,
            state: LinkState::Disconnected,
            baud_rate: settings.baud_rate,
            timeout: settings.connect_timeout(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn port_id(&self) -> Option<&str> {
        self.port_id.as_deref()
    }

    /// Connect with the configured baud rate and timeout
    pub fn connect(&mut self, port_id: &str) -> bool {
        self.connect_with(port_id, self.baud_rate, self.timeout)
    }

    /// Open `port_id`, replacing any existing connection
    pub fn connect_with(&mut self, port_id: &str, baud_rate: u32, timeout: Duration) -> bool {
        if port_id.trim().is_empty() {
            log::error!("{}", SerialError::Configuration("port id is required".to_string()));
            return false;
        }

        if self.state != LinkState::Disconnected {
            self.disconnect();
        }

        self.state = LinkState::Connecting;
        match self.backend.open(port_id, baud_rate, timeout) {
            Ok(port) => {
                self.port = Some(port);
                self.port_id = Some(port_id.to_string());
                self.state = LinkState::Connected;
                log::info!("Connected to {} at {} baud", port_id, baud_rate);
                true
            }
            Err(e) => {
                log::error!("Failed to connect to {}: {}", port_id, e);
                self.state = LinkState::Disconnected;
                false
            }
        }
    }

    /// Close the handle if one is open. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let Some(port) = self.port.take() {
            drop(port);
            if let Some(port_id) = &self.port_id {
                log::info!("Disconnected from {}", port_id);
            }
        }
        self.port_id = None;
        self.state = LinkState::Disconnected;
    }

    /// Connect and return a guard that disconnects when dropped
    pub fn open_scoped(&mut self, port_id: &str) -> Option<SessionGuard<'_>> {
        if self.connect(port_id) {
            Some(SessionGuard { session: self })
        } else {
            None
        }
    }

    /// Encode the six button records and write them as one line
    pub fn send_configuration(&mut self, records: &[ButtonRecord]) -> bool {
        let message = DeviceMessage::from(encode(records));
        self.send_message(&message, "configuration")
    }

    pub fn send_test_message(&mut self) -> bool {
        let message = DeviceMessage::from(PingMessage::with_message(TEST_MESSAGE));
        self.send_message(&message, "test message")
    }

    /// Read one line, optionally overriding the read timeout for this call only.
    /// Any failure is reported as `None`.
    pub fn read_response(&mut self, timeout: Option<Duration>) -> Option<String> {
        match self.try_read_response(timeout) {
            Ok(response) => {
                if let Some(text) = &response {
                    log::debug!("Received response: {}", text);
                }
                response
            }
            Err(e) => {
                log::warn!("Failed to read response: {}", e);
                None
            }
        }
    }

    fn send_message(&mut self, message: &DeviceMessage, label: &str) -> bool {
        match self.write_message(message) {
            Ok(bytes_written) => {
                log::info!(
                    "Sent {} ({} bytes) to {}",
                    label,
                    bytes_written,
                    self.port_id.as_deref().unwrap_or_default()
                );
                true
            }
            Err(e) => {
                log::error!("Failed to send {}: {}", label, e);
                false
            }
        }
    }

    fn write_message(&mut self, message: &DeviceMessage) -> Result<usize> {
        let line = message.to_line()?;
        let port = self.connected_port()?;
        port.write_all(&line)?;
        port.flush()?;
        Ok(line.len())
    }

    fn try_read_response(&mut self, timeout: Option<Duration>) -> Result<Option<String>> {
        let port = self.connected_port()?;

        let original_timeout = port.timeout();
        if let Some(timeout) = timeout {
            port.set_timeout(timeout)?;
        }
        let line = port.read_line();
        if timeout.is_some() {
            port.set_timeout(original_timeout)?;
        }

        match line? {
            Some(raw) => {
                let text = decode_line(&raw)?;
                Ok(if text.is_empty() { None } else { Some(text) })
            }
            None => Ok(None),
        }
    }

    fn connected_port(&mut self) -> Result<&mut Box<dyn SerialPortIO>> {
        match (self.state, self.port.as_mut()) {
            (LinkState::Connected, Some(port)) => Ok(port),
            _ => Err(SerialError::NotConnected),
        }
    }
}

/// A connected session that disconnects on drop
pub struct SessionGuard<'a> {
    session: &'a mut LinkSession,
}

impl Deref for SessionGuard<'_> {
    type Target = LinkSession;

    fn deref(&self) -> &Self::Target {
        self.session
    }
}

impl DerefMut for SessionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.session.disconnect();
    }
}
