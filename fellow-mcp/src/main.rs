//! Fellow MCP server binary.
//!
//! Speaks MCP over stdin/stdout. Stdout carries protocol messages only, so
//! logs go to a file when one is configured and are discarded otherwise.

use anyhow::Context;
use clap::Parser;
use fellow_mcp::config::{ENV_API_KEY, ENV_BASE_URL, ENV_SUBDOMAIN};
use fellow_mcp::{FellowClient, FellowConfig, McpServer};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fellow-mcp")]
#[command(about = "MCP server for Fellow.ai meeting notes and recordings", long_about = None)]
#[command(version)]
struct Cli {
    /// Fellow workspace subdomain ({subdomain}.fellow.app)
    #[arg(long, env = ENV_SUBDOMAIN)]
    subdomain: Option<String>,

    /// Fellow API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// Override the API base URL
    #[arg(long, env = ENV_BASE_URL)]
    base_url: Option<String>,

    /// Append logs to this file
    #[arg(long, env = "FELLOW_MCP_LOG")]
    log_file: Option<PathBuf>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    // RUST_LOG wins over --log-level when set.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fellow_mcp={}", cli.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("fellow_mcp=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<FellowConfig> {
    let config = FellowConfig::new(
        cli.subdomain.clone().unwrap_or_default(),
        cli.api_key.clone().unwrap_or_default(),
    )?;

    match &cli.base_url {
        Some(base_url) if !base_url.trim().is_empty() => Ok(config.with_base_url(base_url)?),
        _ => Ok(config),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = build_config(&cli).context("Invalid Fellow configuration")?;
    info!(
        "fellow-mcp v{} serving {}",
        env!("CARGO_PKG_VERSION"),
        config.base_url
    );

    let client = FellowClient::new(config).context("Failed to create Fellow client")?;
    let server = Arc::new(McpServer::fellow(client));

    server.run_stdio().await.context("stdio transport failed")?;
    info!("Input closed, shutting down");
    Ok(())
}
