//! Saturating confirmation counters for opponent presence and loss.

/// Counter clamped to `[0, required]`: +1 on a matching sample, -1 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaturatingCounter {
    value: u8,
    required: u8,
}

impl SaturatingCounter {
    pub fn new(required: u8) -> Self {
        Self { value: 0, required }
    }

    #[inline]
    pub fn observe(&mut self, matched: bool) {
        if matched {
            if self.value < self.required {
                self.value += 1;
            }
        } else {
            self.value = self.value.saturating_sub(1);
        }
    }

    #[inline]
    pub fn confirmed(&self) -> bool {
        self.value >= self.required
    }

    #[inline]
    pub fn value(&self) -> u8 {
        self.value
    }

    #[inline]
    pub fn required(&self) -> u8 {
        self.required
    }

    #[inline]
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// The two counters shared by fusion and the state machine.
///
/// Fusion feeds every armed sample in; the state machine decides when the
/// loss counter is live (`set_tracking`) and clears counters on transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionHysteresis {
    detect: SaturatingCounter,
    lost: SaturatingCounter,
    tracking: bool,
}

impl DetectionHysteresis {
    pub fn new(detect_required: u8, lost_required: u8) -> Self {
        Self {
            detect: SaturatingCounter::new(detect_required),
            lost: SaturatingCounter::new(lost_required),
            tracking: false,
        }
    }

    /// Feed one sample of the opponent predicate.
    pub fn observe(&mut self, hit: bool) {
        self.detect.observe(hit);
        if self.tracking {
            self.lost.observe(!hit);
        }
    }

    #[inline]
    pub fn present(&self) -> bool {
        self.detect.confirmed()
    }

    #[inline]
    pub fn lost(&self) -> bool {
        self.tracking && self.lost.confirmed()
    }

    pub fn set_tracking(&mut self, tracking: bool) {
        self.tracking = tracking;
    }

    #[inline]
    pub fn tracking(&self) -> bool {
        self.tracking
    }

    pub fn clear_detect(&mut self) {
        self.detect.reset();
    }

    pub fn clear_lost(&mut self) {
        self.lost.reset();
    }

    pub fn clear(&mut self) {
        self.detect.reset();
        self.lost.reset();
    }

    pub fn detect(&self) -> SaturatingCounter {
        self.detect
    }

    pub fn lost_counter(&self) -> SaturatingCounter {
        self.lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decays_instead_of_resetting() {
        let mut c = SaturatingCounter::new(6);
        for _ in 0..5 {
            c.observe(true);
        }
        c.observe(false);
        assert_eq!(c.value(), 4);
        c.observe(true);
        c.observe(true);
        assert!(c.confirmed());
        c.observe(true);
        assert_eq!(c.value(), 6);
    }

    #[test]
    fn lost_counter_only_moves_while_tracking() {
        let mut h = DetectionHysteresis::new(2, 2);
        h.observe(false);
        h.observe(false);
        assert_eq!(h.lost_counter().value(), 0);
        h.set_tracking(true);
        h.observe(false);
        h.observe(false);
        assert!(h.lost());
        h.observe(true);
        assert!(!h.lost());
    }
}
