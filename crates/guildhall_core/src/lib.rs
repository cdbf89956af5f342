//! Shared building blocks for the Guildhall cache and rate-limit crates.
//!
//! - [`Clock`]: the single "now" accessor every store reads time through
//! - [`spawn_sweeper`]: fixed-interval background eviction task
//! - [`init_tracing`]: subscriber setup for binaries

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod sweeper;
mod telemetry;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use sweeper::{Sweep, SweepHandle, SweeperSlot, spawn_sweeper};
pub use telemetry::{TracingHandle, init_tracing};

/// Round a duration up to whole seconds, the granularity users see in retry hints.
pub fn ceil_secs(duration: std::time::Duration) -> u64 {
    let secs = duration.as_millis().div_ceil(1000);
    u64::try_from(secs).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ceil_secs_rounds_up() {
        assert_eq!(ceil_secs(Duration::ZERO), 0);
        assert_eq!(ceil_secs(Duration::from_millis(1)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(1000)), 1);
        assert_eq!(ceil_secs(Duration::from_millis(1001)), 2);
        assert_eq!(ceil_secs(Duration::from_millis(29_999)), 30);
    }
}
