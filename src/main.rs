use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;

use midi_configurator_lib::{commands, init_logging, LinkManager, LinkSettings};

#[derive(Parser)]
#[command(
    name = "midi-configurator",
    version,
    about = "Push button/MIDI mappings to the footswitch controller"
)]
struct Cli {
    /// Link settings file (JSON)
    #[arg(long, env = "MIDI_CONFIGURATOR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate serial ports
    Ports {
        /// Run the ping handshake on every candidate
        #[arg(long)]
        verify: bool,
    },
    /// Run the ping handshake against one port
    Verify {
        port: String,
        /// Ignore cached results
        #[arg(long)]
        fresh: bool,
    },
    /// Check that a port can be opened
    TestPort { port: String },
    /// Send a test ping and print the reply
    Ping { port: String },
    /// Send the button configuration from a JSON records file
    Send {
        port: String,
        records: PathBuf,
        /// Wait for the controller's acknowledgement
        #[arg(long)]
        ack: bool,
    },
    /// Print the first verified controller port
    AutoPort,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = LinkSettings::load_or_default(cli.config.as_deref())
        .context("Failed to load link settings")?;
    init_logging(settings.log_filter());

    let manager = LinkManager::new(settings);

    match cli.command {
        Command::Ports { verify } => {
            let ports = commands::list_ports(&manager, verify).await.map_err(|e| anyhow!(e))?;
            print_json(&ports)
        }
        Command::Verify { port, fresh } => {
            let result = commands::verify_port(&manager, &port, fresh)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&result)
        }
        Command::TestPort { port } => {
            let available = commands::test_port(&manager, &port).await.map_err(|e| anyhow!(e))?;
            print_json(&serde_json::json!({ "portId": port, "isConnected": available }))
        }
        Command::Ping { port } => {
            let outcome = commands::ping_device(&manager, &port).await.map_err(|e| anyhow!(e))?;
            print_json(&outcome)
        }
        Command::Send { port, records, ack } => {
            let outcome = commands::send_configuration(&manager, &port, &records, ack)
                .await
                .map_err(|e| anyhow!(e))?;
            print_json(&outcome)
        }
        Command::AutoPort => {
            match commands::auto_select_port(&manager).await.map_err(|e| anyhow!(e))? {
                Some(port) => println!("{}", port),
                None => return Err(anyhow!("No verified controller found")),
            }
            Ok(())
        }
    }
}
