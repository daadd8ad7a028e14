//! Flaky Server
//!
//! Answers every HTTP request with a configurable status code and can cycle
//! between runs of failures and successes, for testing client retry logic.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request      ┌──────────────────────────────────────────────┐
//!     ────────────────────┼─▶ listener ─▶ middleware ─▶ simulate handler │
//!                         │   (axum)     (request id,        │           │
//!                         │               trace, timeout)    ▼           │
//!                         │                           ┌──────────────┐   │
//!                         │        request dump ◀─────│ FailureCycle │   │
//!     Client Response     │        (raw / JSON)       │ (Arc, Mutex) │   │
//!     ◀───────────────────┼──── status + echo ◀───────└──────────────┘   │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use flaky_server::cli::Cli;
use flaky_server::http::HttpServer;
use flaky_server::lifecycle::Shutdown;
use flaky_server::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability.log_level);

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: flaky_server::ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("flaky-server v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_code = config.response.status_code,
        delay_ms = config.response.delay_ms,
        echo = config.response.echo,
        request_log = config.request_log.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
