//! Watch mode: periodic refresh of stale entries until a shutdown signal.

use crate::store::AvailabilityStore;
use crate::view::DashboardRow;
use seatwatch_runtime::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

/// Refreshes stale entries every `interval` until `shutdown` completes.
///
/// `shutdown` is polled for the whole loop, including while a refresh is
/// running. When it fires mid-refresh the refresh is cancelled, so results
/// still in flight are discarded. `on_refresh` receives the rows after each
/// completed refresh.
///
/// # Errors
///
/// Returns [`StoreError`] if the store was shut down underneath the loop.
pub async fn watch<F, R>(
    store: &AvailabilityStore,
    interval: Duration,
    stale_after: chrono::Duration,
    shutdown: F,
    mut on_refresh: R,
) -> Result<(), StoreError>
where
    F: Future<Output = ()>,
    R: FnMut(Vec<DashboardRow>),
{
    tokio::pin!(shutdown);

    let mut ticker = tokio::time::interval(interval);
    // The first tick completes immediately and everything is fresh.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                tokio::select! {
                    result = store.refresh_stale(stale_after) => {
                        result?;
                        on_refresh(store.rows().await);
                    }
                    () = &mut shutdown => {
                        info!("Shutdown requested during refresh, cancelling");
                        break;
                    }
                }
            }
        }
    }

    store.cancel_refresh().await
}

/// Completes on Ctrl-C or, on unix, SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl-C, stopping");
        },
        () = terminate => {
            info!("Received SIGTERM, stopping");
        },
    }
}
