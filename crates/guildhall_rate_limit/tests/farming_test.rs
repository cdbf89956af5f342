//! Tests for the farming guard.

use guildhall_core::ManualClock;
use guildhall_rate_limit::{FarmingConfig, FarmingDecision, FarmingGuard};

fn guard() -> (FarmingGuard, ManualClock) {
    let clock = ManualClock::new();
    let config = FarmingConfig::default().with_min_interval_ms(30_000);
    (FarmingGuard::with_clock(config, clock.shared()), clock)
}

#[test]
fn test_repeat_within_interval_is_denied() {
    let (guard, clock) = guard();

    assert_eq!(guard.can_proceed(1), FarmingDecision::Allowed);

    let denied = guard.can_proceed(1);
    assert!(!denied.is_allowed());
    assert_eq!(denied.retry_after_secs(), Some(30));

    clock.advance_ms(30_001);
    assert!(guard.can_proceed(1).is_allowed());
}

#[test]
fn test_retry_after_counts_down() {
    let (guard, clock) = guard();
    guard.can_proceed(1);

    clock.advance_ms(10_500);
    match guard.can_proceed(1) {
        FarmingDecision::Denied {
            retry_after_secs,
            reason,
        } => {
            assert_eq!(retry_after_secs, 20);
            assert!(reason.contains("20"));
        }
        FarmingDecision::Allowed => panic!("should still be inside the interval"),
    }
}

#[test]
fn test_denied_attempt_does_not_move_last_action() {
    let (guard, clock) = guard();
    guard.can_proceed(1);

    clock.advance_ms(20_000);
    assert!(!guard.can_proceed(1).is_allowed());

    // 30s after the allowed action, not after the denied one.
    clock.advance_ms(10_000);
    assert!(guard.can_proceed(1).is_allowed());
}

#[test]
fn test_reset_and_sweep() {
    let (guard, clock) = guard();
    guard.can_proceed(1);
    guard.can_proceed(2);

    assert!(guard.reset(1));
    assert!(guard.can_proceed(1).is_allowed());

    clock.advance_ms(30_000);
    assert_eq!(guard.sweep_stale(), 2);
    assert_eq!(guard.stats().tracked_users, 0);
}
