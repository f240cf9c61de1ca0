//! Sweep Task
//!
//! Runs the expiration sweeper on a fixed interval. A pass that overruns the
//! interval delays the next one; passes never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::sweeper::ExpirationSweeper;

/// Longest gap between passes; longer intervals are clamped to it.
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Spawns the periodic sweep. The first pass runs one `interval` after start.
pub fn spawn_sweeper_task(sweeper: Arc<ExpirationSweeper>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.min(MAX_SWEEP_INTERVAL);
    tokio::spawn(async move {
        info!("Starting expiration sweeper every {:?}", interval);

        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweeper.run_once().await;
        }
    })
}
