//! Warden Gateway Node — entry point.
//!
//! Serves the authentication and authorization endpoints of one protected
//! service, with configuration from a TOML file or defaults.

mod api;
mod config;
mod node;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::WardenConfig;
use node::WardenNode;

/// Warden Gateway Node
#[derive(Parser, Debug)]
#[command(name = "warden-node", version, about = "Warden Gateway Node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    /// Override the protected service DID.
    #[arg(long)]
    service_id: Option<String>,

    /// Override the hex-encoded token signing secret.
    #[arg(long)]
    secret_hex: Option<String>,

    /// Override the chain REST gateway URL.
    #[arg(long)]
    lcd_endpoint: Option<String>,

    /// Override the dataverse contract address.
    #[arg(long)]
    dataverse_addr: Option<String>,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = WardenConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = WardenConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(service_id) = args.service_id {
        config.service.id = service_id;
    }
    if let Some(secret_hex) = args.secret_hex {
        config.token.secret_hex = secret_hex;
    }
    if let Some(lcd_endpoint) = args.lcd_endpoint {
        config.dataverse.lcd_endpoint = lcd_endpoint;
    }
    if let Some(dataverse_addr) = args.dataverse_addr {
        config.dataverse.dataverse_addr = dataverse_addr;
    }
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(log_level) = args.log_level {
        config.logging.level = log_level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Warden Gateway Node v{}", env!("CARGO_PKG_VERSION"));

    let node = WardenNode::new(config).await?;
    node.run(shutdown_signal()).await?;

    tracing::info!("Warden node exited cleanly");
    Ok(())
}
