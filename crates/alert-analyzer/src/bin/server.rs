//! Alert analyzer server binary
//!
//! Run with: cargo run -p alert-analyzer --bin alert-analyzer-server

use alert_analyzer::{config::AnalyzerConfig, server::AnalyzerServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "alert-analyzer-server", version, about = "Webhook intake with LLM-backed alert analysis")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // RUST_LOG wins, then LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| match std::env::var("LOG_LEVEL") {
            Ok(level) => EnvFilter::try_new(level.to_lowercase()),
            Err(_) => EnvFilter::try_new("alert_analyzer=info,tower_http=info"),
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                      Alert Analyzer                       ║
║         Durable Webhook Queue with LLM Analysis           ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let mut config = AnalyzerConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Ollama model: {}", config.llm.model);
    tracing::info!("  - Pending queue file: {}", config.queue.mirror_path.display());
    tracing::info!("  - Data directory: {}", config.storage.data_dir.display());
    tracing::info!("  - Prompt template: {}", config.llm.prompt_path.display());

    let llm_url = config.llm.base_url.clone();
    let llm_model = config.llm.model.clone();
    let server = AnalyzerServer::new(config)?;

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", llm_url);
    if server.check_llm().await {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", llm_url);
        tracing::warn!("Alerts will be queued, but analysis fails until Ollama is reachable:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!("  2. Pull model: ollama pull {}", llm_model);
    }

    println!("\nServer starting...");
    println!("  Health: http://{}/", server.address());
    println!("  API Info: http://{}/api/v1/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/v1/webhook - Queue alerts for analysis");
    println!("  GET  /api/v1/queue   - Inspect pending items");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
