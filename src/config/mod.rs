pub mod color;
pub mod encoder;

pub use color::{resolve_color, DEFAULT_COLOR};
pub use encoder::encode;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Persisted state of one physical button, as supplied by the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonRecord {
    pub button_number: u8,
    #[serde(default)]
    pub command_name: Option<String>,
    #[serde(default)]
    pub command_value: Option<u16>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_is_preset")]
    pub is_preset_color: bool,
}

fn default_is_preset() -> bool {
    true
}

impl ButtonRecord {
    /// A button with no command assigned
    pub fn unmapped(button_number: u8) -> Self {
        Self {
            button_number,
            command_name: None,
            command_value: None,
            color: None,
            is_preset_color: true,
        }
    }

    pub fn mapped(button_number: u8, name: impl Into<String>, value: u16) -> Self {
        Self {
            button_number,
            command_name: Some(name.into()),
            command_value: Some(value),
            color: None,
            is_preset_color: true,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>, is_preset: bool) -> Self {
        self.color = Some(color.into());
        self.is_preset_color = is_preset;
        self
    }

    pub fn is_mapped(&self) -> bool {
        self.command_name.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid button records: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read a JSON array of button records
pub fn load_records(path: &Path) -> Result<Vec<ButtonRecord>, RecordsError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<ButtonRecord> = serde_json::from_str(&content)?;
    log::debug!("Loaded {} button records from {}", records.len(), path.display());
    Ok(records)
}
