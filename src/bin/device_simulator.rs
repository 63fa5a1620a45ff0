use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use midi_configurator_lib::serial::SystemBackend;
use midi_configurator_lib::{init_logging, simulator, LinkSettings};

/// Answer controller protocol messages on a serial port
#[derive(Parser)]
#[command(name = "device-simulator", version)]
struct Args {
    /// Serial port to listen on, e.g. /dev/ttyUSB0
    port: String,

    /// Link settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = LinkSettings::load_or_default(args.config.as_deref())
        .context("Failed to load link settings")?;
    init_logging(settings.log_filter());

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Stopping simulator");
            flag.store(false, Ordering::Relaxed);
        }
    });

    let port = args.port.clone();
    tokio::task::spawn_blocking(move || {
        simulator::run(Arc::new(SystemBackend::new()), &port, &settings, running)
    })
    .await?
    .with_context(|| format!("Simulator failed on {}", args.port))
}
