//! Periodic retention sweeper.
//!
//! Runs as a single background task for the lifetime of the process and is
//! stopped through its handle on shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::store::ArtifactStore;

/// Background sweeper service.
pub struct Sweeper {
    store: Arc<ArtifactStore>,
    interval: Duration,
    retention: Duration,
}

/// Handle owning a running [`Sweeper`] task.
pub struct SweeperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn new(store: Arc<ArtifactStore>, interval: Duration, retention: Duration) -> Self {
        Self {
            store,
            interval,
            retention,
        }
    }

    /// Start the sweep loop on the current runtime.
    pub fn spawn(store: Arc<ArtifactStore>, interval: Duration, retention: Duration) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = Self::new(store, interval, retention);
        let task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });
        SweeperHandle { shutdown_tx, task }
    }

    /// Sweep every `interval` until `shutdown` turns true.
    ///
    /// The first sweep happens one interval after start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting artifact sweeper (interval: {:?}, retention: {:?})",
            self.interval, self.retention
        );

        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.store.sweep(self.retention).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Artifact sweeper stopped");
    }
}

impl SweeperHandle {
    /// Signal the task to stop and wait for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Sweeper task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
