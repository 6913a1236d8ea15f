//! Signal handling.
//!
//! SIGINT and SIGTERM cancel the root token. Every external process runs
//! under that token, so its process group is killed and the pending
//! operation returns a cancellation error.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` on the first SIGINT or SIGTERM.
///
/// Must be called from within a tokio runtime.
pub fn install_signal_handlers(token: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigint, mut sigterm) = match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(int), Ok(term)) => (int, term),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "Could not install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, cancelling"),
        _ = sigterm.recv() => info!("Received SIGTERM, cancelling"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, cancelling"),
        Err(e) => {
            warn!(error = %e, "Could not install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
