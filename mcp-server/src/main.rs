mod config;
mod setup;
mod stdio;
mod telemetry;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use setup::{ensure_database_directory_from_config, initialize_app};
use stdio::StdioServer;
use telemetry::{init_telemetry, log_config_validation, log_startup_info};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "scrum-mcp")]
#[command(about = "Local multi-agent coordination engine, driven over stdio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,

    /// `db_path` override — `sqlite://` URL or `:memory:`.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// `bind_host` override, kept for parity with the configured surface.
    #[arg(long, env = "LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// `bind_port` override, kept for parity with the configured surface.
    #[arg(long, env = "BIND_PORT")]
    port: Option<u16>,

    /// `log_level` override.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(config_file) => {
            info!(config_file, "Loading configuration from file");
            Config::from_file(config_file)?
        }
        None => {
            info!("Loading configuration from environment");
            Config::from_env()?
        }
    };

    if let Some(ref database_url) = cli.database_url {
        info!("Overriding database URL from CLI");
        config.database.url = Some(database_url.clone());
    }
    if let Some(ref listen_addr) = cli.listen_addr {
        config.server.listen_addr = listen_addr.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(ref log_level) = cli.log_level {
        info!("Overriding log level from CLI");
        config.logging.level = log_level.clone();
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli).context("Failed to load configuration")?;

    init_telemetry(&config.logging).context("Failed to initialize telemetry")?;
    log_config_validation(&config);

    if let Err(e) = config.validate() {
        error!(error = %e, "Configuration validation failed");
        std::process::exit(1);
    }

    log_startup_info(&config);

    ensure_database_directory_from_config(&config).context("Failed to create database directory")?;

    let dispatcher = initialize_app(&config).await.context("Failed to initialize application")?;
    info!("Coordination engine ready, serving requests over stdio");

    let server = StdioServer::new(dispatcher);

    tokio::select! {
        result = server.serve() => {
            result.context("stdio server exited with an error")?;
            info!("stdio server shut down cleanly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
