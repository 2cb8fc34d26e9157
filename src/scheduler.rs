//! Background collection scheduling.
//!
//! One task runs collection cycles serially on a fixed interval. The wait is
//! stop-aware at one-second granularity, so shutdown latency is bounded; a
//! cycle already in flight is never interrupted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::collector::{Collector, CycleOptions};

const STOP_POLL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            started: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// Spawn the background loop. Returns `false` and does nothing if the
    /// scheduler was already started.
    pub fn start(
        &self,
        collector: Arc<Collector>,
        opts: CycleOptions,
        interval: Duration,
    ) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("collection scheduler already started, ignoring");
            return false;
        }

        let stop_rx = self.stop_tx.subscribe();
        tokio::spawn(async move {
            info!(interval_sec = interval.as_secs(), "collection scheduler started");
            loop {
                let mut waited = Duration::ZERO;
                while waited < interval {
                    if *stop_rx.borrow() {
                        info!("collection scheduler stopped");
                        return;
                    }
                    let step = STOP_POLL.min(interval - waited);
                    tokio::time::sleep(step).await;
                    waited += step;
                }
                if *stop_rx.borrow() {
                    info!("collection scheduler stopped");
                    return;
                }

                // Nothing escapes the loop: a cycle reports its failures in
                // the result instead of propagating them.
                let result = collector.run_cycle(&opts).await;
                if result.failures.is_empty() {
                    info!(
                        players = result.players_collected,
                        matches = result.matches_fetched,
                        "scheduled cycle complete"
                    );
                } else {
                    warn!(
                        players = result.players_collected,
                        matches = result.matches_fetched,
                        failures = result.failures.len(),
                        "scheduled cycle finished with failures"
                    );
                }
            }
        });
        true
    }

    /// Request a stop. Takes effect at the next one-second check.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
