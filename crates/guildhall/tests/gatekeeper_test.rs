//! Tests for event routing through the gatekeeper.

use guildhall::{CooldownDecision, Gatekeeper, GuildhallConfig, ManualClock, SpamVerdict};
use std::time::Duration;

fn gatekeeper() -> (Gatekeeper, ManualClock) {
    let clock = ManualClock::new();
    let gatekeeper = Gatekeeper::with_clock(GuildhallConfig::default(), clock.shared())
        .expect("Default config should be valid");
    (gatekeeper, clock)
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = GuildhallConfig::default();
    config.farming = config.farming.with_sweep_interval_ms(0);
    assert!(Gatekeeper::new(config).is_err());
}

#[test]
fn test_on_command_uses_configured_cooldown() {
    let (gatekeeper, clock) = gatekeeper();

    assert_eq!(
        gatekeeper.on_command(1, "ping"),
        CooldownDecision::Allowed {
            cooldown: Duration::from_secs(3)
        }
    );
    assert_eq!(gatekeeper.on_command(1, "ping").retry_after_secs(), Some(3));

    // One violation: next cooldown is 3s + 1s.
    clock.advance_ms(3_000);
    assert_eq!(
        gatekeeper.on_command(1, "ping"),
        CooldownDecision::Allowed {
            cooldown: Duration::from_secs(4)
        }
    );
}

#[test]
fn test_on_message_flags_burst() {
    let (gatekeeper, clock) = gatekeeper();

    for _ in 0..4 {
        assert_eq!(gatekeeper.on_message(7), SpamVerdict::Clean);
        clock.advance_ms(200);
    }

    match gatekeeper.on_message(7) {
        SpamVerdict::Spamming { mute_duration, .. } => {
            assert_eq!(mute_duration, Duration::from_secs(30))
        }
        SpamVerdict::Clean => panic!("fifth message in the window should be flagged"),
    }

    // Another user is unaffected.
    assert_eq!(gatekeeper.on_message(8), SpamVerdict::Clean);
}

#[test]
fn test_on_points_enforces_interval() {
    let (gatekeeper, clock) = gatekeeper();

    assert!(gatekeeper.on_points(1).is_allowed());
    clock.advance_ms(10_000);
    assert_eq!(gatekeeper.on_points(1).retry_after_secs(), Some(20));
    clock.advance_ms(20_000);
    assert!(gatekeeper.on_points(1).is_allowed());
}

#[test]
fn test_stats_count_event_outcomes() {
    let (gatekeeper, clock) = gatekeeper();

    gatekeeper.on_command(1, "trivia");
    gatekeeper.on_command(1, "trivia");
    gatekeeper.on_points(1);
    gatekeeper.on_points(1);
    gatekeeper.on_points(2);
    gatekeeper.on_message(1);
    gatekeeper.cache().set("leaderboard", serde_json::json!([1, 2, 3]), None);
    gatekeeper.cache().get("leaderboard");
    gatekeeper.cache().get("missing");
    clock.advance_ms(2_500);

    let stats = gatekeeper.stats();
    assert_eq!(stats.uptime_secs, 2);
    assert!(!stats.sweeping);
    assert_eq!(stats.events.commands_allowed, 1);
    assert_eq!(stats.events.commands_denied, 1);
    assert_eq!(stats.events.points_allowed, 2);
    assert_eq!(stats.events.points_denied, 1);
    assert_eq!(stats.events.messages_clean, 1);
    assert_eq!(stats.events.messages_flagged, 0);
    assert_eq!(stats.cooldowns.total_records, 1);
    assert_eq!(stats.farming.tracked_users, 2);
    assert_eq!(stats.spam.tracked_users, 1);
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 1);
    assert!((stats.cache.hit_rate - 0.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_namespace_reads_through_shared_cache() {
    let (gatekeeper, clock) = gatekeeper();
    let leaderboard = gatekeeper
        .namespace("leaderboard")
        .expect("leaderboard namespace is bundled");

    let first: Result<_, std::convert::Infallible> = leaderboard
        .get_or_compute(gatekeeper.cache(), || async { Ok(serde_json::json!(["alice"])) })
        .await;
    assert_eq!(first.unwrap(), serde_json::json!(["alice"]));

    let cached: Result<_, std::convert::Infallible> = leaderboard
        .get_or_compute(gatekeeper.cache(), || async { Ok(serde_json::json!(["bob"])) })
        .await;
    assert_eq!(cached.unwrap(), serde_json::json!(["alice"]));

    clock.advance(leaderboard.ttl() + Duration::from_millis(1));
    assert!(!gatekeeper.cache().contains(leaderboard.key()));
}

#[tokio::test(start_paused = true)]
async fn test_start_and_close_control_every_sweep() {
    let (gatekeeper, clock) = gatekeeper();

    gatekeeper.start();
    assert!(gatekeeper.is_running());
    assert!(gatekeeper.stats().sweeping);

    gatekeeper.on_points(1);
    clock.advance_ms(30_000);
    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(gatekeeper.stats().farming.tracked_users, 0);

    gatekeeper.close();
    assert!(!gatekeeper.is_running());
}
