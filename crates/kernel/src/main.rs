//! Tessera CLI
//!
//! Render, validate and rearrange block documents on disk.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tessera_kernel::Config;
use tessera_kernel::cli::{self, Cli};

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env().context("failed to load configuration")?;
    debug!(
        autosave_delay_ms = config.autosave_delay.as_millis() as u64,
        drag_throttle_ms = config.drag_throttle.as_millis() as u64,
        "Configuration loaded"
    );

    let cli = Cli::parse();
    let mut stdout = std::io::stdout().lock();
    cli::run(cli, &mut stdout)
}

/// Logs go to stderr so rendered output on stdout stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
