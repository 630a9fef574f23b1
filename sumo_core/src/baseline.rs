use crate::config::BaselineMode;
use crate::types::RangeSample;
use crate::util::midpoint;

/// Resolves the baseline distance, either immediately or after a warm-up
/// measurement over the first ticks.
#[derive(Debug, Clone)]
pub struct BaselineEstimator {
    mode: BaselineMode,
    seen: u32,
    valid: u32,
    sum: i64,
    value: Option<i32>,
}

impl BaselineEstimator {
    pub fn new(mode: BaselineMode) -> Self {
        let value = match mode {
            BaselineMode::Fixed(cm) => Some(cm),
            BaselineMode::Measured { samples: 0, fallback } => Some(fallback),
            BaselineMode::Measured { .. } => None,
        };
        Self {
            mode,
            seen: 0,
            valid: 0,
            sum: 0,
            value,
        }
    }

    /// Consume one tick's pair. Returns the baseline once it is known.
    pub fn observe(&mut self, sample: &RangeSample) -> Option<i32> {
        if self.value.is_some() {
            return self.value;
        }
        let BaselineMode::Measured { samples, fallback } = self.mode else {
            return self.value;
        };
        self.seen += 1;
        if sample.both_valid() {
            self.sum += i64::from(midpoint(sample.left_cm, sample.right_cm));
            self.valid += 1;
        }
        if self.seen >= samples {
            let v = if self.valid > 0 {
                (self.sum / i64::from(self.valid)) as i32
            } else {
                fallback
            };
            tracing::debug!(baseline_cm = v, valid = self.valid, "baseline measured");
            self.value = Some(v);
        }
        self.value
    }

    #[inline]
    pub fn value(&self) -> Option<i32> {
        self.value
    }

    /// Start over; a measured baseline is measured again.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }
}
