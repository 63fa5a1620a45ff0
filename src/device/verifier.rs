use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::serial::protocol::{decode_line, is_verification_response};
use crate::serial::{DeviceMessage, PingMessage, PortBackend, Result, SerialPortIO};
use crate::settings::LinkSettings;

use super::models::{VerificationResult, VerificationStatus};

/// Verification results keyed by port id, each with its insertion time
#[derive(Debug)]
pub struct VerificationCache {
    entries: HashMap<String, (VerificationResult, Instant)>,
    ttl: Duration,
}

impl VerificationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn is_fresh(&self, inserted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(inserted_at) < self.ttl
    }

    /// Cached result for the port if younger than the freshness window
    pub fn get_fresh(&self, port_id: &str, now: Instant) -> Option<VerificationResult> {
        self.entries
            .get(port_id)
            .filter(|(_, inserted_at)| self.is_fresh(*inserted_at, now))
            .map(|(result, _)| result.clone())
    }

    pub fn insert(&mut self, port_id: &str, result: VerificationResult, at: Instant) {
        self.entries.insert(port_id.to_string(), (result, at));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Confirms a port is running the controller firmware via ping/response
pub struct DeviceVerifier {
    backend: Arc<dyn PortBackend>,
    cache: Mutex<VerificationCache>,
    baud_rate: u32,
    read_timeout: Duration,
    window: Duration,
    poll_interval: Duration,
}

impl DeviceVerifier {
    pub fn new(backend: Arc<dyn PortBackend>, settings: &LinkSettings) -> Self {
        Self {
            backend,
            cache: Mutex::new(VerificationCache::new(settings.verification_cache_ttl())),
            baud_rate: settings.baud_rate,
            read_timeout: settings.read_timeout(),
            window: settings.verification_window(),
            poll_interval: settings.poll_interval(),
        }
    }

    /// Handshake with the port, or return a fresh cached result
    pub async fn verify(&self, port_id: &str) -> VerificationResult {
        if let Some(cached) = self.cached(port_id) {
            log::debug!("Using cached verification for {}", port_id);
            return cached;
        }

        let result = match self.open(port_id).await {
            Ok(port) => self.handshake(port_id, port).await,
            Err(e) => {
                log::debug!("Verification of {} failed to open port: {}", port_id, e);
                VerificationResult::failed(VerificationStatus::ConnectionError)
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(port_id, result.clone(), Instant::now());
        }
        result
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
        log::info!("Verification cache cleared");
    }

    // Opening can block on the OS for a while, so it runs on the blocking pool.
    async fn open(&self, port_id: &str) -> std::result::Result<Box<dyn SerialPortIO>, String> {
        let backend = self.backend.clone();
        let id = port_id.to_string();
        let (baud_rate, timeout) = (self.baud_rate, self.read_timeout);

        match tokio::task::spawn_blocking(move || backend.open(&id, baud_rate, timeout)).await {
            Ok(opened) => opened.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn cached(&self, port_id: &str) -> Option<VerificationResult> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get_fresh(port_id, Instant::now()))
    }

    // The port handle is dropped on every exit path.
    async fn handshake(&self, port_id: &str, mut port: Box<dyn SerialPortIO>) -> VerificationResult {
        let started = match send_ping(port.as_mut()) {
            Ok(started) => started,
            Err(e) => {
                log::debug!("Verification of {} failed to send ping: {}", port_id, e);
                return VerificationResult::failed(VerificationStatus::ConnectionError);
            }
        };

        while started.elapsed() < self.window {
            let waiting = match port.bytes_to_read() {
                Ok(waiting) => waiting,
                Err(e) => {
                    log::debug!("Verification of {} lost the port: {}", port_id, e);
                    return VerificationResult::failed(VerificationStatus::ConnectionError);
                }
            };

            if waiting > 0 {
                match port.read_line() {
                    Ok(Some(raw)) => {
                        if accepts_line(port_id, &raw) {
                            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
                            let rounded = (elapsed_ms * 100.0).round() / 100.0;
                            log::info!("Verified controller on {} in {} ms", port_id, rounded);
                            return VerificationResult::verified(rounded);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("Verification of {} read failed: {}", port_id, e);
                        return VerificationResult::failed(VerificationStatus::ConnectionError);
                    }
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        log::debug!("No response from {} within {:?}", port_id, self.window);
        VerificationResult::failed(VerificationStatus::NoResponse)
    }
}

fn send_ping(port: &mut dyn SerialPortIO) -> Result<Instant> {
    port.clear_buffers()?;
    let line = DeviceMessage::from(PingMessage::now()).to_line()?;
    let started = Instant::now();
    port.write_all(&line)?;
    port.flush()?;
    Ok(started)
}

// Undecodable or non-JSON lines are skipped, not failures.
fn accepts_line(port_id: &str, raw: &[u8]) -> bool {
    let line = match decode_line(raw) {
        Ok(line) if !line.is_empty() => line,
        Ok(_) => return false,
        Err(e) => {
            log::debug!("Skipping line from {}: {}", port_id, e);
            return false;
        }
    };

    match is_verification_response(&line) {
        Ok(accepted) => accepted,
        Err(e) => {
            log::debug!("Skipping line from {}: {}", port_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_entry_expires_after_ttl() {
        let mut cache = VerificationCache::new(Duration::from_secs(60));
        let now = Instant::now();
        let old = now.checked_sub(Duration::from_secs(61)).unwrap_or(now);

        cache.insert("COM3", VerificationResult::verified(12.5), now);
        cache.insert("COM4", VerificationResult::verified(8.0), old);

        assert_eq!(cache.get_fresh("COM3", now), Some(VerificationResult::verified(12.5)));
        if old != now {
            assert_eq!(cache.get_fresh("COM4", now), None);
        }
        assert_eq!(cache.get_fresh("COM5", now), None);
    }

    #[test]
    fn cache_clear_drops_everything() {
        let mut cache = VerificationCache::new(Duration::from_secs(60));
        cache.insert("COM3", VerificationResult::failed(VerificationStatus::NoResponse), Instant::now());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn line_acceptance() {
        assert!(accepts_line("p", b"{\"type\":\"response\"}\n"));
        assert!(!accepts_line("p", b"{\"type\":\"pong\"}\n"));
        assert!(!accepts_line("p", b"garbage\n"));
        assert!(!accepts_line("p", &[0xc3, 0x28, b'\n']));
        assert!(!accepts_line("p", b"\r\n"));
    }
}
