//! Background eviction task.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::TtlCache;

/// Default age after which an entry is swept (1 hour).
pub const DEFAULT_CACHE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default period between sweeps (1 hour).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Spawn a task that sweeps `cache` every `interval`, dropping entries older
/// than `window`.
///
/// The first sweep runs one full `interval` after spawning. Persistence
/// failures are logged and the loop keeps going. Cancel `shutdown` and await
/// the handle to stop it cleanly before the final flush.
pub fn spawn_sweeper(
    cache: Arc<TtlCache>,
    window: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            window_secs = window.as_secs(),
            interval_secs = interval.as_secs(),
            "Starting cache sweeper"
        );

        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Cache sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let before = cache.len().await;
                    match cache.sweep(window).await {
                        Ok(removed) => info!(
                            before,
                            removed,
                            after = before.saturating_sub(removed),
                            "Cache sweep complete"
                        ),
                        Err(e) => error!(error = %e, "Cache sweep could not persist"),
                    }
                }
            }
        }
    })
}
