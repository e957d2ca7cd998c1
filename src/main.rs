//! Counter gate server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser request
//!     ──────────────▶ request id ─▶ trace ─▶ limits ─▶ hardening headers
//!                                                        │
//!                                                        ▼
//!                                              CSP middleware (fresh nonce)
//!                                                        │
//!                                                        ▼
//!                                              page shell (nonce inline)
//!
//!     Operator console (counter-cli)
//!     ──────────────▶ LoginWorkflow / VerificationWorkflow
//!                        │ session, limiter, grammar
//!                        ▼
//!                     PostgREST RPC (remote authority)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use counter_gate::config::{config_from_env, load_config};
use counter_gate::observability::{logging, metrics};
use counter_gate::{lifecycle, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "counter-gate")]
#[command(about = "Serves the counter pages with per-request security headers", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment overrides when absent.
    #[arg(short, long, env = "GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => config_from_env()?,
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "counter-gate starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend_configured = config.backend.base_url().is_some(),
        headers_enabled = config.security.enable_headers,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        lifecycle::wait_for_signal().await;
        trigger.trigger();
    });

    HttpServer::new(config).run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
