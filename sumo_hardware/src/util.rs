use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Spin until `is_high()` reports `level`, or `timeout` expires.
///
/// Returns the instant the level was first observed. Echo pulses are only a
/// few hundred microseconds wide, so this busy-waits with `spin_loop` instead
/// of sleeping.
pub fn wait_for_level(
    mut is_high: impl FnMut() -> bool,
    level: bool,
    timeout: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    loop {
        let now = Instant::now();
        if is_high() == level {
            return Ok(now);
        }
        if now >= deadline {
            return Err(HwError::Timeout);
        }
        std::hint::spin_loop();
    }
}
