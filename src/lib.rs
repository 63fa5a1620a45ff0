pub mod serial;
pub mod device;
pub mod commands;
pub mod config;
pub mod settings;
pub mod simulator;

pub use device::{DeviceLink, LinkManager};
pub use settings::LinkSettings;

/// Install the process logger. `RUST_LOG` overrides `level`.
pub fn init_logging(level: log::LevelFilter) {
  let _ = env_logger::Builder::new()
    .filter_level(level)
    .parse_default_env()
    .try_init();
}
