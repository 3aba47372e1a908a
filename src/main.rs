//! Warden CLI - supervised process execution with output capture.
//!
//! # Usage
//!
//! ```bash
//! # Run with warden.toml from the working directory (or defaults)
//! warden
//!
//! # Run with an explicit configuration file and overrides
//! warden --config /etc/warden.toml --host 0.0.0.0 --port 8080
//! ```

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use warden::WardenConfig;
use warden::api::server;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - process supervision with output capture", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host override
    #[arg(long)]
    host: Option<String>,

    /// Bind port override
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("warden=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => WardenConfig::load_from_path(path)?,
        None => WardenConfig::load()?,
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    server::start_server(config).await
}
