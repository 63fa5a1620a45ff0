use serde::{Deserialize, Serialize};

/// Link session state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of the ping/response handshake
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    NotTested,
    MidiVerified,
    NoResponse,
    ConnectionError,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub is_midi_device: bool,
    pub is_verified: bool,
    pub status: VerificationStatus,
    pub response_time_ms: Option<f64>,
}

impl VerificationResult {
    pub fn verified(response_time_ms: f64) -> Self {
        Self {
            is_midi_device: true,
            is_verified: true,
            status: VerificationStatus::MidiVerified,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(status: VerificationStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

/// A plausible controller port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortCandidate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    pub product: String,
    #[serde(flatten)]
    pub verification: Option<VerificationResult>,
}

impl PortCandidate {
    pub fn is_midi_device(&self) -> bool {
        self.verification
            .as_ref()
            .map(|v| v.is_midi_device)
            .unwrap_or(false)
    }

    pub fn is_verified(&self) -> bool {
        self.verification
            .as_ref()
            .map(|v| v.is_verified)
            .unwrap_or(false)
    }
}
