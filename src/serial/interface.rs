use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort, SerialPortInfo, SerialPortType};

use super::{PortDescriptor, Result, SerialError};

const GENERIC_USB_DESCRIPTION: &str = "USB Serial Device";

/// Raw byte-level access to one open serial port
pub trait SerialPortIO: Send {
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Read up to and including the next `\n`, bounded by the current timeout.
    /// Bytes received before the timeout are returned even without a newline;
    /// `None` means nothing arrived.
    fn read_line(&mut self) -> Result<Option<Vec<u8>>>;

    fn bytes_to_read(&mut self) -> Result<u32>;

    fn clear_buffers(&mut self) -> Result<()>;

    fn timeout(&self) -> Duration;

    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}

/// Source of serial ports: enumeration plus opening
pub trait PortBackend: Send + Sync {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>>;

    fn open(&self, port_id: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPortIO>>;
}

/// Backend over the operating system's serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBackend;

impl SystemBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PortBackend for SystemBackend {
    fn available_ports(&self) -> Result<Vec<PortDescriptor>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(describe_port).collect())
    }

    fn open(&self, port_id: &str, baud_rate: u32, timeout: Duration) -> Result<Box<dyn SerialPortIO>> {
        let port = serialport::new(port_id, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| SerialError::PortOpen {
                port: port_id.to_string(),
                reason: e.to_string(),
            })?;

        log::debug!("Opened {} at {} baud", port_id, baud_rate);
        Ok(Box::new(SystemPort::new(port)))
    }
}

fn describe_port(info: SerialPortInfo) -> PortDescriptor {
    match info.port_type {
        SerialPortType::UsbPort(usb_info) => PortDescriptor {
            device: info.port_name,
            description: Some(
                usb_info
                    .product
                    .clone()
                    .unwrap_or_else(|| GENERIC_USB_DESCRIPTION.to_string()),
            ),
            manufacturer: usb_info.manufacturer,
            product: usb_info.product,
            vid: Some(usb_info.vid),
            pid: Some(usb_info.pid),
        },
        _ => PortDescriptor::new(info.port_name),
    }
}

/// An open OS serial port with a line buffer
pub struct SystemPort {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SystemPort {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            pending: Vec::new(),
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.iter().position(|b| *b == b'\n')?;
        Some(self.pending.drain(..=pos).collect())
    }

    /// Read until `pending` holds a newline. Running out of time is `ReadTimeout`.
    fn fill_until(&mut self, deadline: Instant) -> Result<()> {
        let mut buffer = [0u8; 256];

        while self.pending.iter().all(|b| *b != b'\n') {
            let now = Instant::now();
            if now >= deadline {
                return Err(SerialError::ReadTimeout);
            }
            self.port.set_timeout(deadline - now)?;

            match self.port.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => self.pending.extend_from_slice(&buffer[..n]),
                Err(ref e) if e.kind() == ErrorKind::TimedOut => return Err(SerialError::ReadTimeout),
                Err(e) => return Err(SerialError::IoError(e)),
            }
        }

        Ok(())
    }
}

impl SerialPortIO for SystemPort {
    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data).map_err(write_error)
    }

    fn flush(&mut self) -> Result<()> {
        self.port.flush().map_err(write_error)
    }

    fn read_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }

        let original_timeout = self.port.timeout();
        let deadline = Instant::now() + original_timeout;
        let filled = self.fill_until(deadline);
        self.port.set_timeout(original_timeout)?;
        match filled {
            Ok(()) | Err(SerialError::ReadTimeout) => {}
            Err(e) => return Err(e),
        }

        if let Some(line) = self.take_line() {
            Ok(Some(line))
        } else if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut self.pending)))
        }
    }

    fn bytes_to_read(&mut self) -> Result<u32> {
        let waiting = self.port.bytes_to_read()?;
        Ok(waiting + self.pending.len() as u32)
    }

    fn clear_buffers(&mut self) -> Result<()> {
        self.pending.clear();
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.port.timeout()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

fn write_error(e: std::io::Error) -> SerialError {
    if e.kind() == ErrorKind::TimedOut {
        SerialError::WriteTimeout
    } else {
        SerialError::IoError(e)
    }
}
