use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ButtonRecord;
use crate::serial::{PortBackend, SystemBackend};
use crate::settings::LinkSettings;

use super::{DeviceVerifier, LinkSession, LinkState, PortCatalog, PortCandidate, VerificationResult};

/// Result of a connect, send, read, disconnect cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub connected: bool,
    pub sent: bool,
    pub acknowledgement: Option<String>,
}

/// Operations the request layer performs against the controller
#[async_trait::async_trait]
pub trait DeviceLink: Send + Sync {
    async fn connect(&self, port_id: &str) -> bool;

    async fn disconnect(&self);

    async fn send_configuration(&self, records: &[ButtonRecord]) -> bool;

    async fn send_test_message(&self) -> bool;

    async fn read_response(&self, timeout: Option<Duration>) -> Option<String>;

    async fn list_ports(&self) -> Vec<PortCandidate>;

    async fn test_port_connection(&self, port_id: &str) -> bool;

    async fn verify(&self, port_id: &str) -> VerificationResult;
}

/// Central device link system.
/// Owns the single link session plus port discovery and verification.
pub struct LinkManager {
    session: Arc<Mutex<LinkSession>>,
    catalog: Arc<PortCatalog>,
    verifier: DeviceVerifier,
    settings: LinkSettings,
}

impl LinkManager {
    pub fn new(settings: LinkSettings) -> Self {
        Self::with_backend(Arc::new(SystemBackend::new()), settings)
    }

    pub fn with_backend(backend: Arc<dyn PortBackend>, settings: LinkSettings) -> Self {
        Self {
            session: Arc::new(Mutex::new(LinkSession::new(backend.clone(), &settings))),
            catalog: Arc::new(PortCatalog::new(backend.clone(), &settings)),
            verifier: DeviceVerifier::new(backend, &settings),
            settings,
        }
    }

    /// Replace the port catalog, e.g. to pin the host platform
    pub fn with_catalog(mut self, catalog: PortCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub async fn state(&self) -> LinkState {
        self.session.lock().await.state()
    }

    pub async fn connected_port(&self) -> Option<String> {
        self.session.lock().await.port_id().map(str::to_string)
    }

    /// Candidate ports with handshake results, verified controllers first
    pub async fn discover_ports(&self) -> Vec<PortCandidate> {
        self.catalog.discover_ports(&self.verifier).await
    }

    pub async fn auto_select_port(&self) -> Option<String> {
        self.catalog.auto_select_port(&self.verifier).await
    }

    pub fn clear_verification_cache(&self) {
        self.verifier.clear_cache();
    }

    /// Run blocking serial work against the session on the blocking pool,
    /// holding the session lock for the whole call.
    async fn with_session<T, F>(&self, op: F) -> Option<T>
    where
        F: FnOnce(&mut LinkSession) -> T + Send + 'static,
        T: Send + 'static,
    {
        let mut session = self.session.clone().lock_owned().await;
        match tokio::task::spawn_blocking(move || op(&mut session)).await {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Serial task failed: {}", e);
                None
            }
        }
    }

    /// Connect, send the configuration, optionally wait for an acknowledgement,
    /// and always disconnect, all under one session lock.
    pub async fn push_configuration(
        &self,
        port_id: &str,
        records: &[ButtonRecord],
        await_ack: bool,
    ) -> PushOutcome {
        let read_timeout = self.settings.read_timeout();
        let port_id = port_id.to_string();
        let records = records.to_vec();

        self.with_session(move |session| {
            let Some(mut link) = session.open_scoped(&port_id) else {
                return PushOutcome::default();
            };

            let sent = link.send_configuration(&records);
            let acknowledgement = if sent && await_ack {
                link.read_response(Some(read_timeout))
            } else {
                None
            };

            if let Some(ack) = &acknowledgement {
                log::info!("Controller on {} acknowledged: {}", port_id, ack);
            }

            PushOutcome {
                connected: true,
                sent,
                acknowledgement,
            }
        })
        .await
        .unwrap_or_default()
    }

    /// Connect, send a test ping, read one reply, and disconnect
    pub async fn ping(&self, port_id: &str) -> PushOutcome {
        let read_timeout = self.settings.read_timeout();
        let port_id = port_id.to_string();

        self.with_session(move |session| {
            let Some(mut link) = session.open_scoped(&port_id) else {
                return PushOutcome::default();
            };

            let sent = link.send_test_message();
            let acknowledgement = if sent {
                link.read_response(Some(read_timeout))
            } else {
                None
            };

            PushOutcome {
                connected: true,
                sent,
                acknowledgement,
            }
        })
        .await
        .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl DeviceLink for LinkManager {
    async fn connect(&self, port_id: &str) -> bool {
        let port_id = port_id.to_string();
        self.with_session(move |session| session.connect(&port_id))
            .await
            .unwrap_or(false)
    }

    async fn disconnect(&self) {
        self.session.lock().await.disconnect();
    }

    async fn send_configuration(&self, records: &[ButtonRecord]) -> bool {
        let records = records.to_vec();
        self.with_session(move |session| session.send_configuration(&records))
            .await
            .unwrap_or(false)
    }

    async fn send_test_message(&self) -> bool {
        self.with_session(|session| session.send_test_message())
            .await
            .unwrap_or(false)
    }

    async fn read_response(&self, timeout: Option<Duration>) -> Option<String> {
        self.with_session(move |session| session.read_response(timeout))
            .await
            .flatten()
    }

    async fn list_ports(&self) -> Vec<PortCandidate> {
        let catalog = self.catalog.clone();
        match tokio::task::spawn_blocking(move || catalog.list_ports()).await {
            Ok(ports) => ports,
            Err(e) => {
                log::error!("Port enumeration task failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn test_port_connection(&self, port_id: &str) -> bool {
        let catalog = self.catalog.clone();
        let port_id = port_id.to_string();
        let timeout = self.settings.probe_timeout();

        tokio::task::spawn_blocking(move || catalog.test_port_connection(&port_id, timeout))
            .await
            .unwrap_or_else(|e| {
                log::error!("Port test task failed: {}", e);
                false
            })
    }

    async fn verify(&self, port_id: &str) -> VerificationResult {
        self.verifier.verify(port_id).await
    }
}

impl Default for LinkManager {
    fn default() -> Self {
        Self::new(LinkSettings::default())
    }
}
