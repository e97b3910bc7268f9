/*!
# Photon Ingest

Realtime ingest pipeline for a multi-board photon-counting detector array.
Binds a UDP socket at line rate, persists the raw byte stream to bulk
storage in one-second file segments, and continuously assembles a 2D
photon-count image over each one-second interval.

## Usage

```bash
photon-ingest run --port 50000 --ramdisk-dir /dev/shm/photon-ingest
```

## Configuration file mode

```bash
photon-ingest config --output ingest.toml
photon-ingest --config ingest.toml
```
*/

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

mod aggregator;
mod config;
mod control;
mod framer;
mod ingestor;
mod recorder;
mod supervisor;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "photon-ingest")]
#[command(about = "Realtime UDP ingest, bulk capture, and photon-count aggregation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path, used when no subcommand overrides are given.
    #[arg(short, long, default_value = "photon-ingest.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ingest pipeline.
    Run {
        /// UDP bind address.
        #[arg(long)]
        bind_addr: Option<String>,

        /// UDP port to listen on.
        #[arg(long)]
        port: Option<u16>,

        /// Ramdisk directory for control files and `.img` output.
        #[arg(long)]
        ramdisk_dir: Option<PathBuf>,

        /// Downstream PNG renderer path.
        #[arg(long)]
        renderer_path: Option<String>,
    },

    /// Generate a default configuration file.
    Config {
        /// Output path for the configuration file.
        #[arg(short, long, default_value = "photon-ingest.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            bind_addr,
            port,
            ramdisk_dir,
            renderer_path,
        }) => {
            let mut config = AppConfig::load_from_file(&cli.config).unwrap_or_else(|e| {
                warn!(error = %e, "failed to load config, using defaults");
                AppConfig::default()
            });
            if let Some(v) = bind_addr {
                config.udp_bind_addr = v;
            }
            if let Some(v) = port {
                config.udp_port = v;
            }
            if let Some(v) = ramdisk_dir {
                config.ramdisk_dir = v;
            }
            if let Some(v) = renderer_path {
                config.renderer_path = v;
            }
            supervisor::run(config)
        }
        Some(Commands::Config { output }) => {
            AppConfig::new().save_to_file(&output)?;
            println!("generated configuration file: {}", output.display());
            Ok(())
        }
        None => supervisor::run(AppConfig::load_from_file(&cli.config).unwrap_or_else(|e| {
            warn!(error = %e, "failed to load config, using defaults");
            AppConfig::default()
        })),
    }
}
