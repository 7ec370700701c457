//! Background eviction of silent backend devices

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::registry::Registry;

/// Sweeper timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Maximum silence before an entry is evicted
    pub stale_after: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            stale_after: Duration::from_secs(5 * 60),
        }
    }
}

/// Handle to the running sweep task. The task stops when this is dropped.
#[derive(Debug)]
pub struct Sweeper {
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The first sweep runs one full interval after start.
    pub fn spawn(registry: Arc<Registry>, config: SweeperConfig) -> Self {
        let handle = spawn_ticker(config.interval, move || {
            run_sweep(&registry, config.stale_after);
        });

        debug!(
            interval_secs = config.interval.as_secs(),
            stale_after_secs = config.stale_after.as_secs(),
            "Sweeper started"
        );

        Self {
            handle: Some(handle),
        }
    }

    /// Stop the sweep task and wait for it to finish
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
            debug!("Sweeper stopped");
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Call `tick` every `interval`, starting one interval from now
fn spawn_ticker<F>(interval: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; skip that tick
        ticker.tick().await;

        loop {
            ticker.tick().await;
            tick();
        }
    })
}

/// Run a single sweep. A panic inside the sweep is logged and swallowed so
/// the next tick still runs.
///
/// Returns the number of evicted entries, or `None` if the sweep failed.
pub fn run_sweep(registry: &Registry, stale_after: Duration) -> Option<usize> {
    let threshold = match chrono::Duration::from_std(stale_after) {
        Ok(threshold) => threshold,
        Err(e) => {
            error!(error = %e, "Invalid stale threshold, skipping sweep");
            return None;
        }
    };

    guarded(registry, || registry.evict_stale(Utc::now(), threshold))
}

/// Run `evict`, logging its outcome. A panic yields `None`.
fn guarded<F>(registry: &Registry, evict: F) -> Option<usize>
where
    F: FnOnce() -> Vec<String>,
{
    match std::panic::catch_unwind(AssertUnwindSafe(evict)) {
        Ok(evicted) => {
            for client_id in &evicted {
                info!(client_id = %client_id, "Evicted stale backend");
            }
            debug!(
                evicted = evicted.len(),
                remaining = registry.count(),
                "Sweep complete"
            );
            Some(evicted.len())
        }
        Err(_) => {
            error!("Sweep panicked, will retry on next tick");
            None
        }
    }
}
