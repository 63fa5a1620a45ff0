pub mod catalog;
pub mod manager;
pub mod models;
pub mod session;
pub mod verifier;

pub use catalog::{HostPlatform, PortCatalog};
pub use manager::{DeviceLink, LinkManager, PushOutcome};
pub use models::*;
pub use session::{LinkSession, SessionGuard};
pub use verifier::{DeviceVerifier, VerificationCache};
