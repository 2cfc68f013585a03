// src/engine/shutdown.rs

//! Operator signals -> cancellation.

use tokio::signal::unix::{SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancel `token` on Ctrl-C or `SIGTERM`, whichever comes first.
///
/// Cancellation is idempotent; later signals have no further effect.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                None
            }
        };

        let ctrl_c = tokio::select! {
            _ = token.cancelled() => return,
            res = tokio::signal::ctrl_c() => Some(res),
            _ = recv_sigterm(sigterm.as_mut()) => None,
        };

        match ctrl_c {
            Some(Ok(())) => info!("interrupt received; shutting down"),
            Some(Err(err)) => {
                error!(error = %err, "failed to listen for Ctrl+C");
                // Still honour SIGTERM and programmatic cancellation.
                wait_for_sigterm(&token, sigterm.as_mut()).await;
                return;
            }
            None => info!("terminate received; shutting down"),
        }

        token.cancel();
    })
}

async fn recv_sigterm(sigterm: Option<&mut tokio::signal::unix::Signal>) {
    match sigterm {
        Some(s) => {
            s.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn wait_for_sigterm(
    token: &CancellationToken,
    sigterm: Option<&mut tokio::signal::unix::Signal>,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = recv_sigterm(sigterm) => {
            info!("terminate received; shutting down");
            token.cancel();
        }
    }
}
