use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use secrecy::SecretString;
use tracing::Level;
use warroom_core::responder::AgentResponder;
use warroom_llm::{CerebrasConfig, CerebrasResponder, DEFAULT_API_URL, DEFAULT_MODEL};
use warroom_server::ServerConfig;
use warroom_telemetry::{init_telemetry, TelemetryConfig};

/// Multi-agent clinical case discussion server.
#[derive(Parser, Debug)]
#[command(name = "warroom", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 9091)]
    port: u16,

    /// Remote orchestration service base URL. When set, discussions are
    /// offered to it first, falling back to the local engine.
    #[arg(long)]
    remote_url: Option<String>,

    /// Chat-completions endpoint used by the local engine.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Model requested from the completions endpoint.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Delay between specialist turns, in milliseconds.
    #[arg(long, default_value_t = 300)]
    pacing_ms: u64,

    /// Log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging and metrics
    let telemetry = init_telemetry(TelemetryConfig {
        log_level: cli.log_level,
        ..TelemetryConfig::default()
    });

    tracing::info!("Starting war room server");

    // Completions client for the local engine
    let api_key = std::env::var("CEREBRAS_API_KEY").expect("CEREBRAS_API_KEY is not set");
    let responder_config = CerebrasConfig::new(SecretString::from(api_key))
        .with_api_url(cli.api_url)
        .with_model(cli.model);
    let responder: Arc<dyn AgentResponder> = Arc::new(
        CerebrasResponder::new(responder_config).expect("Failed to build completions client"),
    );

    // Start server
    let config = ServerConfig {
        port: cli.port,
        remote_url: cli.remote_url,
        agent_pacing: Duration::from_millis(cli.pacing_ms),
        ..ServerConfig::default()
    };
    let handle = warroom_server::start(config, responder, telemetry.metrics().cloned())
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "War room server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!(active_runs = handle.active_runs(), "Shutting down");
    handle.abort_all_runs();
}
