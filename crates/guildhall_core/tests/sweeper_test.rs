//! Tests for the background sweeper task.

use guildhall_core::{Sweep, SweeperSlot, spawn_sweeper};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct CountingStore {
    cycles: AtomicUsize,
    panic_on_first: bool,
}

impl Sweep for CountingStore {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn sweep(&self) -> usize {
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first && cycle == 0 {
            panic!("first sweep fails");
        }
        cycle
    }
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_runs_on_fixed_interval() {
    let store = Arc::new(CountingStore::default());
    let handle = spawn_sweeper(Arc::downgrade(&store), Duration::from_secs(60));

    // Nothing runs before the first full period.
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(62)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 2);

    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn test_panicking_cycle_does_not_stop_schedule() {
    let store = Arc::new(CountingStore {
        panic_on_first: true,
        ..Default::default()
    });
    let _handle = spawn_sweeper(Arc::downgrade(&store), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(35)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_future_cycles() {
    let store = Arc::new(CountingStore::default());
    let handle = spawn_sweeper(Arc::downgrade(&store), Duration::from_secs(10));

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 1);

    handle.stop();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_exits_when_owner_dropped() {
    let store = Arc::new(CountingStore::default());
    let handle = spawn_sweeper(Arc::downgrade(&store), Duration::from_secs(10));
    drop(store);

    tokio::time::sleep(Duration::from_secs(15)).await;
    tokio::task::yield_now().await;
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_slot_runs_at_most_one_sweeper() {
    let store = Arc::new(CountingStore::default());
    let slot = SweeperSlot::new();

    slot.start(Arc::downgrade(&store), Duration::from_secs(10));
    slot.start(Arc::downgrade(&store), Duration::from_secs(10));
    assert!(slot.is_running());

    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(store.cycles.load(Ordering::SeqCst), 1);

    slot.stop();
    assert!(!slot.is_running());
}
