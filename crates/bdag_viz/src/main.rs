//! BlockDAG dashboard server.
//!
//! Serves the live DAG visualizer, analytics panel and explorer data over HTTP and
//! WebSocket.

use bdag_viz::client::DEFAULT_BASE_URL;
use bdag_viz::{Result, VizConfig, VizServer};
use clap::Parser;

/// BlockDAG network visualizer
#[derive(Parser, Debug)]
#[command(name = "bdag-viz")]
#[command(version)]
#[command(about = "Live BlockDAG network dashboard", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Seed every random source for a reproducible session
    #[arg(long)]
    seed: Option<u64>,

    /// Ledger tick period in milliseconds
    #[arg(long, default_value_t = bdag_viz::feed::TICK_INTERVAL_MS)]
    tick_ms: u64,

    /// Explorer base URL for the network panels
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// Never contact the explorer
    #[arg(long)]
    offline: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = VizConfig {
        host: args.host,
        port: args.port,
        enable_cors: !args.no_cors,
        enable_tracing: args.verbose > 0,
        tick_interval_ms: args.tick_ms,
        rng_seed: args.seed,
        api_base_url: (!args.offline).then_some(args.api_url),
        ..VizConfig::default()
    };
    if let Some(seed) = config.rng_seed {
        log::info!("Using RNG seed {}", seed);
    }
    if config.api_base_url.is_none() {
        log::info!("Explorer access disabled, serving synthetic network data");
    }

    let server = VizServer::new(config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for CTRL+C: {}", e);
            return;
        }
        log::info!("Shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await
}
