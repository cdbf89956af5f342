//! Tests for sliding-window spam detection.

use guildhall_core::ManualClock;
use guildhall_rate_limit::{AntiSpamManager, SpamConfig, SpamVerdict};
use std::time::Duration;

fn detector() -> (AntiSpamManager, ManualClock) {
    let clock = ManualClock::new();
    let config = SpamConfig::default()
        .with_message_threshold(5)
        .with_time_window_ms(5_000);
    (AntiSpamManager::with_clock(config, clock.shared()), clock)
}

#[test]
fn test_fifth_message_in_window_is_spam() {
    let (spam, clock) = detector();

    for _ in 0..4 {
        assert_eq!(spam.check_spam(1), SpamVerdict::Clean);
        clock.advance_ms(100);
    }

    match spam.check_spam(1) {
        SpamVerdict::Spamming {
            mute_duration,
            reason,
        } => {
            assert_eq!(mute_duration, Duration::from_secs(30));
            assert!(reason.contains('5'));
        }
        SpamVerdict::Clean => panic!("fifth message should be flagged"),
    }

    clock.advance_ms(5_001);
    assert_eq!(spam.check_spam(1), SpamVerdict::Clean);
}

#[test]
fn test_window_slides_instead_of_resetting() {
    let (spam, clock) = detector();

    // Messages at t=0, 1s, 2s, 3s.
    for _ in 0..4 {
        assert!(!spam.check_spam(1).is_spamming());
        clock.advance_ms(1_000);
    }

    // t=4s: all four still inside the window.
    assert!(spam.check_spam(1).is_spamming());

    // t=5.5s: the t=0 message has aged out, leaving three.
    clock.advance_ms(1_500);
    assert!(!spam.check_spam(1).is_spamming());
    assert_eq!(spam.recent_messages(1), 4);
}

#[test]
fn test_users_have_separate_windows() {
    let (spam, _clock) = detector();

    for _ in 0..4 {
        spam.check_spam(1);
    }
    assert!(spam.check_spam(1).is_spamming());
    assert!(!spam.check_spam(2).is_spamming());
}

#[test]
fn test_clear_history_resets_user() {
    let (spam, _clock) = detector();

    for _ in 0..4 {
        spam.check_spam(1);
    }
    assert!(spam.clear_history(1));
    assert_eq!(spam.recent_messages(1), 0);
    assert!(!spam.check_spam(1).is_spamming());
    assert!(!spam.clear_history(2));
}

#[test]
fn test_sweep_drops_idle_users_only() {
    let (spam, clock) = detector();

    spam.check_spam(1);
    clock.advance_ms(4_000);
    spam.check_spam(2);

    clock.advance_ms(1_001);
    assert_eq!(spam.sweep_idle(), 1);
    assert_eq!(spam.stats().tracked_users, 1);
    assert_eq!(spam.recent_messages(2), 1);
}
