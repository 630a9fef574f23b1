//! Tick timing helpers.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Tick period in microseconds for a loop rate in Hz.
///
/// `hz == 0` is treated as 1 Hz and the result never drops below 1 µs.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Integer mean of two readings, truncated toward zero. Computed in `i64`,
/// so any pair of `i32` values is safe.
#[inline]
pub fn midpoint(a: i32, b: i32) -> i32 {
    // |(a + b) / 2| <= max(|a|, |b|), so the narrowing is lossless
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

#[inline]
pub fn tick_period(hz: u32) -> Duration {
    Duration::from_micros(period_us(hz))
}

/// True when nothing has happened yet (`last == None`) or at least `every`
/// ms have passed since `last`. A clock that appears to run backwards counts
/// as no time passed.
#[inline]
pub fn interval_due(last: Option<u64>, now_ms: u64, every_ms: u64) -> bool {
    last.is_none_or(|t| now_ms.saturating_sub(t) >= every_ms)
}
