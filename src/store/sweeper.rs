use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::TokenStore;

/// Periodically delete expired records until `shutdown` flips to true.
///
/// A failed sweep is logged and retried on the next tick.
pub fn spawn(
    store: TokenStore,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Expiry sweeper started (every {}s)", interval.as_secs_f64());

        loop {
            if *shutdown.borrow() {
                break;
            }

            sweep_once(&store).await;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    })
}

/// Returns the number of records removed, or `None` if the sweep failed.
pub async fn sweep_once(store: &TokenStore) -> Option<u64> {
    tracing::debug!("Expiry sweep: start");
    match store.purge_expired().await {
        Ok(count) => {
            if count > 0 {
                tracing::info!(removed = count, "Expiry sweep: done");
            }
            Some(count)
        }
        Err(e) => {
            tracing::error!("Expiry sweep failed: {e}");
            None
        }
    }
}
