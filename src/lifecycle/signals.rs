//! OS signal handling.
//!
//! SIGINT and SIGTERM become a cancellation: the workflow stops probing and
//! restores the ingress before the process exits. Further signals are logged
//! and forwarded again; they cannot abort a restore.

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Resolve on the next SIGINT or SIGTERM.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Forward every termination signal to `cancel` for the rest of the process.
pub fn forward_signals(cancel: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            termination_signal().await;
            tracing::warn!("Termination signal received, restoring the ingress before exit");
            cancel.trigger();
        }
    })
}
