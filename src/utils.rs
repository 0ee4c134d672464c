use tokio::signal;
use tracing::{error, warn};

/// Wait for the process to be asked to stop.
///
/// Completes on the first of Ctrl+C or, on Unix, SIGTERM. A listener that
/// fails to register is logged and treated as never firing.
pub async fn shutdown_signal() {
    tokio::select! {
        () = interrupt() => warn!("Ctrl+C received, draining connections"),
        () = terminate() => warn!("SIGTERM received, draining connections"),
    }
}

async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Could not listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Could not listen for SIGTERM");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
