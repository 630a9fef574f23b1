//! Runtime configuration for the behavior core.
//!
//! These are separate from the TOML-deserialized config in `sumo_config`;
//! see `conversions` for the bridge. Defaults match the tuned competition
//! robot.

use crate::types::Rotation;

/// Where the "nothing in front of us" distance comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMode {
    /// Use this distance (cm) for every invalid reading.
    Fixed(i32),
    /// Average the first `samples` ticks where both sensors read, falling back
    /// to `fallback` (cm) when none did.
    Measured { samples: u32, fallback: i32 },
}

impl Default for BaselineMode {
    fn default() -> Self {
        BaselineMode::Fixed(1000)
    }
}

/// Sensor fusion and debounce tuning.
#[derive(Debug, Clone)]
pub struct FusionCfg {
    /// Ring buffer capacity (distance samples).
    pub buffer_size: usize,
    /// Drop below the buffer mean that counts as a sighting (cm).
    pub detection_threshold_cm: i32,
    /// Absolute "very close" distance, and the left/right resolution margin (cm).
    pub track_threshold_cm: i32,
    pub detect_required: u8,
    pub lost_required: u8,
    /// Quiet period after `begin` before detection can arm.
    pub warmup_ms: u64,
    /// Full buffer turns required after the quiet period.
    pub settle_wraps: u32,
    pub baseline: BaselineMode,
}

impl Default for FusionCfg {
    fn default() -> Self {
        Self {
            buffer_size: 8,
            detection_threshold_cm: 30,
            track_threshold_cm: 15,
            detect_required: 6,
            lost_required: 8,
            warmup_ms: 3000,
            settle_wraps: 2,
            baseline: BaselineMode::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorCfg {
    pub startup_rotate: bool,
    pub startup_rotation: Rotation,
    pub search_rotation: Rotation,
    /// Escape spin when the edge flags give no clear way out.
    pub ambiguous_rotation: Rotation,
    pub edge_backoff_ms: u64,
}

impl Default for BehaviorCfg {
    fn default() -> Self {
        Self {
            startup_rotate: false,
            startup_rotation: Rotation::Cw,
            search_rotation: Rotation::Ccw,
            ambiguous_rotation: Rotation::Ccw,
            edge_backoff_ms: 300,
        }
    }
}

/// Wheel speed targets, in encoder ticks per control interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCfg {
    pub max_tick_speed: f32,
    pub cruise_fraction: f32,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            max_tick_speed: 25.0,
            cruise_fraction: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiCfg {
    pub kp: f32,
    pub ki: f32,
    /// Updates closer together than this are skipped.
    pub update_interval_ms: u64,
    /// Turns ticks-per-elapsed-ms into ticks per interval.
    pub velocity_scale: f32,
}

impl Default for PiCfg {
    fn default() -> Self {
        Self {
            kp: 7.0,
            ki: 2.0,
            update_interval_ms: 500,
            velocity_scale: 100.0,
        }
    }
}

/// Loop pacing and sensor timeouts.
#[derive(Debug, Clone)]
pub struct Timing {
    pub tick_hz: u32,
    pub echo_timeout_us: u64,
    pub status_every_ms: u64,
    pub countdown_s: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_hz: 50,
            echo_timeout_us: 15_000,
            status_every_ms: 100,
            countdown_s: 3,
        }
    }
}
