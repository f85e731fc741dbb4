//! Background Expiry Sweeper
//!
//! Reads already treat expired items as absent, but an item that is never
//! read again would sit in its backend forever. Every store therefore owns a
//! sweeper: a Tokio task that wakes up at a fixed interval and runs the
//! store's [`Store::gc`].
//!
//! ## Design
//!
//! The sweeper:
//! 1. Sleeps for the configured interval (default: 30s)
//! 2. Upgrades its weak reference to the store (exits if the store is gone)
//! 3. Runs `gc()` on the blocking pool, since the file backend does disk I/O
//! 4. Logs how many items were reclaimed
//!
//! The task is cancellable: the store keeps an [`ExpirySweeper`] handle, and
//! both `close()` and dropping the store signal it to stop.

use crate::error::{Result, StoreError};
use crate::storage::Store;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// A handle to a running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Stops the expiry sweeper. Calling it more than once is harmless.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        let already_stopped = self.shutdown_tx.send_replace(true);
        if !already_stopped {
            info!("Background expiry sweeper stopped");
        }
    }

    /// Returns true once [`ExpirySweeper::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builds a store around a fresh sweeper handle and starts its sweep loop on
/// the current Tokio runtime.
///
/// The loop only holds a weak reference, so it never keeps the store alive.
pub(crate) fn start_with_sweeper<S, F>(interval: Duration, build: F) -> Result<Arc<S>>
where
    S: Store,
    F: FnOnce(ExpirySweeper) -> S,
{
    let runtime = Handle::try_current().map_err(|_| StoreError::NoRuntime)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let store = Arc::new(build(ExpirySweeper { shutdown_tx }));

    runtime.spawn(sweeper_loop(Arc::downgrade(&store), interval, shutdown_rx));

    info!(
        backend = S::KIND,
        ?interval,
        "Background expiry sweeper started"
    );

    Ok(store)
}

/// The main sweeper loop.
async fn sweeper_loop<S: Store>(
    target: Weak<S>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!(backend = S::KIND, "Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let Some(store) = target.upgrade() else {
            debug!(backend = S::KIND, "Store dropped, expiry sweeper exiting");
            return;
        };

        let started = Instant::now();
        match tokio::task::spawn_blocking(move || store.gc()).await {
            Ok(Ok(0)) => {
                trace!(backend = S::KIND, "Expiry sweep found nothing to reclaim");
            }
            Ok(Ok(reclaimed)) => {
                debug!(
                    backend = S::KIND,
                    reclaimed = reclaimed,
                    elapsed = ?started.elapsed(),
                    "Expired items reclaimed"
                );
            }
            Ok(Err(StoreError::Closed)) => {
                debug!(backend = S::KIND, "Store closed, expiry sweeper exiting");
                return;
            }
            Ok(Err(e)) => {
                warn!(backend = S::KIND, error = %e, "Expiry sweep aborted");
            }
            Err(e) => {
                error!(backend = S::KIND, error = %e, "Expiry sweep task failed");
            }
        }
    }
}
