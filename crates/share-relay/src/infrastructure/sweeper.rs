//! Background idle-session sweeper.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::broker::Broker;

/// How often the shutdown flag is checked between sweeps.
const SHUTDOWN_POLL: Duration = Duration::from_millis(200);

/// Spawns a task that calls [`Broker::sweep`] every `every` until `running`
/// is cleared.
///
/// The first sweep happens one full period after start.  A sweep that
/// overruns delays the following tick rather than bunching them up.
pub fn spawn_sweeper(broker: Arc<Broker>, every: Duration, running: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("idle sweeper started (every {every:?})");
        let mut tick = interval(every);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        tick.tick().await;

        while running.load(Ordering::Relaxed) {
            tokio::select! {
                _ = tick.tick() => {
                    let evicted = broker.sweep(Instant::now());
                    if evicted.is_empty() {
                        debug!("sweep found no idle sessions");
                    } else {
                        info!(evicted = evicted.len(), "sweep evicted idle sessions");
                    }
                }
                _ = sleep(SHUTDOWN_POLL) => {}
            }
        }
        debug!("idle sweeper stopped");
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
