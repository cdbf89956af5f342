//! Fixed-interval background sweeps.
//!
//! Each store that evicts stale data implements [`Sweep`] and hands a weak
//! reference to [`spawn_sweeper`]. The task never keeps its owner alive: once
//! the owner is dropped the next tick finds nothing to upgrade and the task ends.

use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// A store with stale entries to evict.
pub trait Sweep: Send + Sync + 'static {
    /// Name used in log fields.
    fn name(&self) -> &'static str;

    /// Evict everything that is no longer valid. Returns the number of entries removed.
    fn sweep(&self) -> usize;
}

/// Handle to a running sweep task. Dropping it cancels the task.
#[derive(Debug)]
pub struct SweepHandle {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Cancel the sweep task.
    pub fn stop(self) {
        info!(sweeper = self.name, "Stopping sweeper");
        self.handle.abort();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Name of the swept store.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task that calls [`Sweep::sweep`] every `period`.
///
/// The first sweep runs one full period after spawning. A cycle that panics is
/// logged and the schedule continues.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_sweeper<S: Sweep>(target: Weak<S>, period: Duration) -> SweepHandle {
    let name = target.upgrade().map(|t| t.name()).unwrap_or("detached");
    let period = period.max(Duration::from_millis(1));

    info!(sweeper = name, period_ms = period.as_millis() as u64, "Starting sweeper");

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(target) = target.upgrade() else {
                debug!(sweeper = name, "Owner dropped, sweeper exiting");
                break;
            };

            match std::panic::catch_unwind(AssertUnwindSafe(|| target.sweep())) {
                Ok(removed) => debug!(sweeper = name, removed, "Sweep cycle complete"),
                Err(_) => warn!(sweeper = name, "Sweep cycle panicked, continuing schedule"),
            }
        }
    });

    SweepHandle { name, handle }
}

/// Owner-side slot for a store's sweeper: at most one task, stoppable on demand.
#[derive(Debug, Default)]
pub struct SweeperSlot {
    handle: Mutex<Option<SweepHandle>>,
}

impl SweeperSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a sweeper for `target` unless one is already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: Sweep>(&self, target: Weak<S>, period: Duration) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("Sweeper already running");
            return;
        }
        *handle = Some(spawn_sweeper(target, period));
    }

    /// Cancel the running sweeper, if any.
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.stop();
        }
    }

    /// Whether a sweeper task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}
