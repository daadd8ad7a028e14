//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config and environment
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Logs go to stderr so request dumps on stdout stay clean
//! - RUST_LOG takes precedence over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter used when RUST_LOG is unset.
pub fn default_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(format!("flaky_server={log_level},tower_http={log_level}"))
        .unwrap_or_else(|_| EnvFilter::new("flaky_server=info,tower_http=info"))
}

/// Install the global tracing subscriber.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(log_level));

    // A subscriber may already be installed (tests, embedding).
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
