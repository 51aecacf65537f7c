use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use dipsy_bridge::{routes, AppState, BridgeConfig, Prompts};

/// Dipsy Bridge - real-time voice bridge between telephony media streams and
/// the OpenAI Realtime API
#[derive(Parser, Debug)]
#[command(name = "dipsy-bridge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Bind host (overrides HOST)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Path to an env file loaded before configuration (default: .env)
    #[arg(long, value_name = "FILE")]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load .env before config loading
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for the outbound TLS WebSocket
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install default crypto provider"))?;

    // Missing secrets are fatal: the bridge must not accept calls it cannot
    // configure or log.
    let mut config = BridgeConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let prompts = Prompts {
        agent: fs::read_to_string(&config.base_prompt_path)
            .with_context(|| format!("failed to read agent prompt {}", config.base_prompt_path))?,
        summary: fs::read_to_string(&config.summary_prompt_path).with_context(|| {
            format!("failed to read summary prompt {}", config.summary_prompt_path)
        })?,
    };

    let address = config.address();
    let app_state = Arc::new(AppState::new(config, prompts));
    let app = routes::create_router().with_state(app_state);

    info!(%address, "starting dipsy-bridge");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
