//! Tests for guard configuration parsing.

use guildhall_rate_limit::{CooldownConfig, FarmingConfig, SpamConfig};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct Sections {
    cooldown: CooldownConfig,
    spam: SpamConfig,
    farming: FarmingConfig,
}

#[test]
fn test_partial_sections_fill_defaults() {
    let sections: Sections = toml::from_str(
        r#"
[cooldown]
escalation_step_ms = 2_000

[cooldown.commands]
trivia = 10_000

[spam]
message_threshold = 8

[farming]
"#,
    )
    .unwrap();

    assert_eq!(sections.cooldown.escalation_step(), Duration::from_secs(2));
    assert_eq!(sections.cooldown.cooldown_for("trivia"), Duration::from_secs(10));
    assert_eq!(*sections.cooldown.sweep_interval_ms(), 60_000);

    assert_eq!(*sections.spam.message_threshold(), 8);
    assert_eq!(sections.spam.time_window(), Duration::from_secs(5));
    assert_eq!(sections.spam.mute_duration(), Duration::from_secs(30));

    assert_eq!(sections.farming.min_interval(), Duration::from_secs(30));
}
