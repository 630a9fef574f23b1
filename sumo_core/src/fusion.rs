//! Sensor fusion and debounce.
//!
//! Turns one range pair and one set of edge flags per tick into a
//! [`FusedReport`]. Nothing here can fail: out-of-range readings fall back to
//! the baseline and a missing opponent is just `opponent_present == false`.

use crate::baseline::BaselineEstimator;
use crate::config::FusionCfg;
use crate::hysteresis::DetectionHysteresis;
use crate::ring::DistanceRing;
use crate::types::{EdgeFlags, OpponentSide, RangeSample};
use crate::util::midpoint;

/// Everything the state machine needs to know about one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FusedReport {
    /// Detection counter is confirmed and the warm-up guard has lifted.
    pub opponent_present: bool,
    /// Loss counter is confirmed (only meaningful while tracking).
    pub opponent_lost: bool,
    pub opponent_side: OpponentSide,
    pub both_out_of_range: bool,
    pub edge: EdgeFlags,
    /// Warm-up guard has lifted and the counters are live.
    pub armed: bool,
    pub baseline_cm: Option<i32>,
    /// Buffer mean before this tick's sample was pushed.
    pub buffer_mean: i32,
    pub buffer_filled: bool,
    /// This tick's normalized average distance.
    pub current_cm: i32,
}

impl FusedReport {
    #[inline]
    pub fn edge_triggered(&self) -> bool {
        self.edge.any()
    }
}

#[derive(Debug)]
pub struct SensorFusion {
    cfg: FusionCfg,
    baseline: BaselineEstimator,
    ring: Option<DistanceRing>,
    hysteresis: DetectionHysteresis,
    /// Ring push count at the moment the warm-up period ran out.
    settle_from: Option<u64>,
    armed: bool,
}

impl SensorFusion {
    pub fn new(cfg: FusionCfg) -> Self {
        let baseline = BaselineEstimator::new(cfg.baseline);
        let hysteresis = DetectionHysteresis::new(cfg.detect_required, cfg.lost_required);
        let ring = baseline
            .value()
            .map(|b| DistanceRing::new(cfg.buffer_size, b));
        Self {
            cfg,
            baseline,
            ring,
            hysteresis,
            settle_from: None,
            armed: false,
        }
    }

    /// Forget everything learned so far and re-enter warm-up.
    pub fn begin(&mut self) {
        *self = Self::new(self.cfg.clone());
    }

    pub fn cfg(&self) -> &FusionCfg {
        &self.cfg
    }

    pub fn hysteresis(&self) -> &DetectionHysteresis {
        &self.hysteresis
    }

    pub fn hysteresis_mut(&mut self) -> &mut DetectionHysteresis {
        &mut self.hysteresis
    }

    pub fn ring(&self) -> Option<&DistanceRing> {
        self.ring.as_ref()
    }

    #[inline]
    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Normalize a raw reading: anything that is not a real distance
    /// becomes the baseline.
    #[inline]
    fn normalize(d: i32, baseline: i32) -> i32 {
        if d <= 0 { baseline } else { d }
    }

    /// Fuse one tick. `elapsed_ms` is time since `begin`.
    pub fn update(&mut self, sample: RangeSample, edge: EdgeFlags, elapsed_ms: u64) -> FusedReport {
        let mut report = FusedReport {
            edge,
            both_out_of_range: sample.both_out_of_range(),
            opponent_side: self.resolve_side(&sample),
            ..FusedReport::default()
        };

        let Some(baseline) = self.baseline.observe(&sample) else {
            return report;
        };
        report.baseline_cm = Some(baseline);
        let ring = self
            .ring
            .get_or_insert_with(|| DistanceRing::new(self.cfg.buffer_size, baseline));

        let current = midpoint(
            Self::normalize(sample.left_cm, baseline),
            Self::normalize(sample.right_cm, baseline),
        );
        let mean = ring.mean();
        ring.push(current);
        report.buffer_mean = mean;
        report.current_cm = current;
        report.buffer_filled = ring.filled();

        if !self.armed {
            if elapsed_ms >= self.cfg.warmup_ms && self.settle_from.is_none() {
                self.settle_from = Some(ring.pushes());
            }
            if let Some(from) = self.settle_from {
                let needed = u64::from(self.cfg.settle_wraps.max(1)) * ring.capacity() as u64;
                if ring.pushes() - from >= needed {
                    self.armed = true;
                    tracing::debug!(elapsed_ms, pushes = ring.pushes(), "fusion armed");
                }
            }
        }

        if self.armed {
            let big_drop = mean.saturating_sub(current) > self.cfg.detection_threshold_cm;
            let very_close = current < self.cfg.track_threshold_cm;
            self.hysteresis.observe(big_drop || very_close);
            report.opponent_present = self.hysteresis.present();
            report.opponent_lost = self.hysteresis.lost();
        }
        report.armed = self.armed;
        report
    }

    fn resolve_side(&self, s: &RangeSample) -> OpponentSide {
        if !s.both_valid() {
            return OpponentSide::None;
        }
        let margin = self.cfg.track_threshold_cm;
        if s.left_cm < s.right_cm.saturating_sub(margin) {
            OpponentSide::Left
        } else if s.right_cm < s.left_cm.saturating_sub(margin) {
            OpponentSide::Right
        } else {
            OpponentSide::None
        }
    }
}
