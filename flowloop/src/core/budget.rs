//! Shared time budget helpers for deterministic orchestration.

use std::time::{Duration, Instant};

/// Remaining time budget until `deadline`, or `None` once it has passed.
pub fn remaining_budget(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|remaining| !remaining.is_zero())
}

/// Milliseconds since `started_at`, saturating at `u64::MAX`.
pub fn elapsed_ms(started_at: Instant, now: Instant) -> u64 {
    u64::try_from(now.saturating_duration_since(started_at).as_millis()).unwrap_or(u64::MAX)
}
