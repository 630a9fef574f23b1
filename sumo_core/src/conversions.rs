//! `From` implementations bridging `sumo_config` types to `sumo_core` types.

use crate::config::{BaselineMode, BehaviorCfg, DriveCfg, FusionCfg, PiCfg, Timing};
use crate::types::Rotation;

// ── Rotation ─────────────────────────────────────────────────────────────────

impl From<sumo_config::Rotation> for Rotation {
    fn from(r: sumo_config::Rotation) -> Self {
        match r {
            sumo_config::Rotation::Cw => Rotation::Cw,
            sumo_config::Rotation::Ccw => Rotation::Ccw,
        }
    }
}

// ── FusionCfg ────────────────────────────────────────────────────────────────

impl From<&sumo_config::BaselineCfg> for BaselineMode {
    fn from(c: &sumo_config::BaselineCfg) -> Self {
        if c.measured_samples == 0 {
            BaselineMode::Fixed(c.fixed_cm)
        } else {
            BaselineMode::Measured {
                samples: c.measured_samples,
                fallback: c.fallback_cm,
            }
        }
    }
}

impl From<&sumo_config::FusionCfg> for FusionCfg {
    fn from(c: &sumo_config::FusionCfg) -> Self {
        Self {
            buffer_size: c.buffer_size,
            detection_threshold_cm: c.detection_threshold_cm,
            track_threshold_cm: c.track_threshold_cm,
            detect_required: c.detect_required,
            lost_required: c.lost_required,
            warmup_ms: c.warmup_ms,
            settle_wraps: c.settle_wraps,
            baseline: BaselineMode::from(&c.baseline),
        }
    }
}

// ── BehaviorCfg ──────────────────────────────────────────────────────────────

impl From<&sumo_config::BehaviorCfg> for BehaviorCfg {
    fn from(c: &sumo_config::BehaviorCfg) -> Self {
        Self {
            startup_rotate: c.startup_rotate,
            startup_rotation: c.startup_rotation.into(),
            search_rotation: c.search_rotation.into(),
            ambiguous_rotation: c.ambiguous_rotation.into(),
            edge_backoff_ms: c.edge_backoff_ms,
        }
    }
}

// ── DriveCfg / PiCfg ─────────────────────────────────────────────────────────

impl From<&sumo_config::DriveCfg> for DriveCfg {
    fn from(c: &sumo_config::DriveCfg) -> Self {
        Self {
            max_tick_speed: c.max_tick_speed,
            cruise_fraction: c.cruise_fraction,
        }
    }
}

impl From<&sumo_config::PiCfg> for PiCfg {
    fn from(c: &sumo_config::PiCfg) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            update_interval_ms: c.update_interval_ms,
            velocity_scale: c.velocity_scale,
        }
    }
}

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<&sumo_config::Timing> for Timing {
    fn from(c: &sumo_config::Timing) -> Self {
        Self {
            tick_hz: c.tick_hz,
            echo_timeout_us: c.echo_timeout_us,
            status_every_ms: c.status_every_ms,
            countdown_s: c.countdown_s,
        }
    }
}
