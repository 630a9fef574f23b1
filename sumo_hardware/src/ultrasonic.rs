//! Ultrasonic helpers shared by the real and simulated range drivers.

use sumo_traits::{OUT_OF_RANGE, Side};

/// Speed of sound in centimetres per microsecond.
const CM_PER_US: f64 = 0.0343;

/// Convert a round-trip echo pulse width to centimetres, rounded to the
/// nearest cm. A zero-length pulse (timeout) maps to [`OUT_OF_RANGE`].
pub fn echo_us_to_cm(echo_us: u64) -> i32 {
    if echo_us == 0 {
        return OUT_OF_RANGE;
    }
    let cm = (echo_us as f64 * CM_PER_US) / 2.0;
    (cm + 0.5) as i32
}

/// Left/right rotation: left on even polls, right on odd polls.
#[derive(Debug, Clone, Copy)]
pub struct Alternator {
    next: Side,
}

impl Default for Alternator {
    fn default() -> Self {
        Self { next: Side::Left }
    }
}

impl Alternator {
    /// Side to fire now; the following call returns the other side.
    #[inline]
    pub fn advance(&mut self) -> Side {
        let side = self.next;
        self.next = side.other();
        side
    }
}
