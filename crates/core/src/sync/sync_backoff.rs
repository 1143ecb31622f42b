//! Retry and cadence helpers for the sync scheduler.

use rand::Rng;
use std::time::Duration;

const MAX_EXPONENT: u32 = 8;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped.
pub fn retry_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(MAX_EXPONENT);
    base.saturating_mul(2_u32.pow(exponent)).min(max)
}

/// Periodic interval clamped to `minimum`, plus up to `jitter` extra.
pub fn periodic_delay(interval: Duration, minimum: Duration, jitter: Duration) -> Duration {
    let base = interval.max(minimum);
    let jitter_ms = jitter.as_millis().min(u128::from(u64::MAX)) as u64;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
}
