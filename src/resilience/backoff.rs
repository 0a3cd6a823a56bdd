//! Exponential backoff with jitter for breaker reopen timeouts.

use std::time::Duration;
use rand::Rng;

/// Calculate how long an Open circuit holds before the next probe window.
///
/// The first open uses the base timeout; each consecutive reopen doubles
/// it, capped at `max`. Jitter (0 to 10% of the delay) keeps probe
/// windows from synchronizing across resources.
pub fn reopen_timeout(reopen_count: u32, base: Duration, max: Duration) -> Duration {
    let exponent = 2u64.saturating_pow(reopen_count.min(16));
    let delay_ms = (base.as_millis() as u64).saturating_mul(exponent);
    let capped = delay_ms.min(max.as_millis() as u64);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
