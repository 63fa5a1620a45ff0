#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use midi_configurator_lib::serial::{PortBackend, PortDescriptor, Result, SerialError, SerialPortIO};
use midi_configurator_lib::LinkSettings;

/// Per-port behaviour of the scripted backend
#[derive(Default)]
struct PortScript {
    refuse: bool,
    replies: Vec<Vec<u8>>,
    opens: Arc<AtomicUsize>,
    written: Arc<Mutex<Vec<u8>>>,
    timeouts: Arc<Mutex<Vec<Duration>>>,
    in_use: Arc<AtomicBool>,
}

/// In-memory stand-in for the OS serial ports.
/// Replies queued with `respond` become readable after the first flush.
#[derive(Default)]
pub struct ScriptedBackend {
    ports: Vec<PortDescriptor>,
    fail_enumeration: bool,
    open_delay: Option<Duration>,
    scripts: Mutex<HashMap<String, PortScript>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: PortDescriptor) -> Self {
        self.ports.push(port);
        self
    }

    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    /// Make every open block the calling thread, like a slow USB driver
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Accept opens on `port_id`, answering each flush with `lines`
    pub fn respond(self, port_id: &str, lines: &[&[u8]]) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap();
            let script = scripts.entry(port_id.to_string()).or_default();
            script.replies = lines.iter().map(|l| l.to_vec()).collect();
        }
        self
    }

    /// Accept opens on `port_id` and never answer
    pub fn silent(self, port_id: &str) -> Self {
        self.respond(port_id, &[])
    }

    pub fn refuse(self, port_id: &str) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap();
            scripts.entry(port_id.to_string()).or_default().refuse = true;
        }
        self
    }

    pub fn opens(&self, port_id: &str) -> usize {
        self.scripts
            .lock()
            .unwrap()
            .get(port_id)
            .map(|s| s.opens.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn written(&self, port_id: &str) -> Vec<u8> {
        self.scripts
            .lock()
            .unwrap()
            .get(port_id)
            .map(|s| s.written.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn written_text(&self, port_id: &str) -> String {
        String::from_utf8(self.written(port_id)).unwrap()
    }

    pub fn timeouts(&self, port_id: &str) -> Vec<Duration> {
        self.scripts
            .lock()
            .unwrap()
            .get(port_id)
            .map(|s| s.timeouts.lock().unwrap().clone())
            .unwrap_or_default()
    }

    pub fn is_open(&self, port_id: &str) -> bool {
        self.scripts
            .lock()
            .unwrap()
            .get(port_id)
            .map(|s| s.in_use.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}

impl PortBackend for ScriptedBackend {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        if self.fail_enumeration {
            return Err(SerialError::IoError(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "enumeration denied",
            )));
        }
        Ok(self.ports.clone())
    }

    fn open(&self, port_id: &str, _baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPortIO>> {
        if let Some(delay) = self.open_delay {
            std::thread::sleep(delay);
        }

        let scripts = self.scripts.lock().unwrap();
        let script = match scripts.get(port_id) {
            Some(script) if !script.refuse => script,
            _ => {
                return Err(SerialError::PortOpen {
                    port: port_id.to_string(),
                    reason: "No such file or directory".to_string(),
                })
            }
        };

        if script.in_use.swap(true, Ordering::SeqCst) {
            return Err(SerialError::PortOpen {
                port: port_id.to_string(),
                reason: "Device or resource busy".to_string(),
            });
        }
        script.opens.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedPort {
            replies: script.replies.clone(),
            inbound: VecDeque::new(),
            written: script.written.clone(),
            timeouts: script.timeouts.clone(),
            in_use: script.in_use.clone(),
            timeout,
        }))
    }
}

struct ScriptedPort {
    replies: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
    written: Arc<Mutex<Vec<u8>>>,
    timeouts: Arc<Mutex<Vec<Duration>>>,
    in_use: Arc<AtomicBool>,
    timeout: Duration,
}

impl SerialPortIO for ScriptedPort {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.written.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inbound.extend(self.replies.drain(..));
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.inbound.pop_front())
    }

    fn bytes_to_read(&mut self) -> Result<u32> {
        Ok(self.inbound.iter().map(|l| l.len() as u32).sum())
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.inbound.clear();
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeouts.lock().unwrap().push(timeout);
        self.timeout = timeout;
        Ok(())
    }
}

impl Drop for ScriptedPort {
    fn drop(&mut self) {
        self.in_use.store(false, Ordering::SeqCst);
    }
}

/// Settings with short verification timing so tests run quickly
pub fn fast_settings() -> LinkSettings {
    LinkSettings {
        verification_window_ms: 200,
        poll_interval_ms: 10,
        ..LinkSettings::default()
    }
}

pub fn usb_port(device: &str, manufacturer: &str, product: &str) -> PortDescriptor {
    PortDescriptor {
        device: device.to_string(),
        description: Some(product.to_string()),
        manufacturer: Some(manufacturer.to_string()),
        product: Some(product.to_string()),
        vid: Some(0x303A),
        pid: Some(0x1001),
    }
}
