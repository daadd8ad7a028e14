//! OS signal handling.
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGTERM and SIGINT both mean graceful shutdown

/// Wait until the process is asked to stop.
#[cfg(unix)]
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("SIGINT received");
        }
        _ = terminate.recv() => {
            tracing::info!("SIGTERM received");
        }
    }
    Ok(())
}

/// Wait until the process is asked to stop.
#[cfg(not(unix))]
pub async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Ctrl+C received");
    Ok(())
}
