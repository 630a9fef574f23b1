#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration persistence for the sumo robot.
//!
//! - `Config` and its sections are deserialized from TOML and checked by
//!   `Config::validate`.
//! - `CsvSettingsStore` persists the line-sensor threshold table keyed by the
//!   human-readable code labels.
use serde::Deserialize;

pub mod atomic;
pub mod store;

pub use store::{CsvSettingsStore, MemorySettingsStore};

/// Largest reading of the 12-bit line ADC.
pub const ADC_FULL_SCALE: i32 = 4096;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub left_trigger: u8,
    pub left_echo: u8,
    pub right_trigger: u8,
    pub right_echo: u8,
    /// H-bridge inputs for the left wheel (channel A).
    pub in1a: u8,
    pub in2a: u8,
    /// H-bridge inputs for the right wheel (channel B).
    pub in1b: u8,
    pub in2b: u8,
    pub pwm_a: u8,
    pub pwm_b: u8,
    pub encoder_a: u8,
    pub encoder_b: u8,
    /// MCP3008 channel wired to the line-detector ladder.
    #[serde(default)]
    pub line_adc_channel: u8,
}

/// Rotation sense used by the search and escape manoeuvres.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Cw,
    #[default]
    Ccw,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BaselineCfg {
    /// Number of warm-up ticks used to measure the open-ring distance.
    /// 0 keeps the fixed baseline.
    pub measured_samples: u32,
    /// Baseline used when not measuring.
    pub fixed_cm: i32,
    /// Baseline used when measuring produced no valid pair.
    pub fallback_cm: i32,
}

impl Default for BaselineCfg {
    fn default() -> Self {
        Self {
            measured_samples: 0,
            fixed_cm: 1000,
            fallback_cm: 200,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FusionCfg {
    pub buffer_size: usize,
    /// Drop below the buffer mean that counts as a sighting (cm).
    pub detection_threshold_cm: i32,
    /// Anything nearer than this is a sighting; also the left/right margin (cm).
    pub track_threshold_cm: i32,
    pub detect_required: u8,
    pub lost_required: u8,
    pub warmup_ms: u64,
    /// Full buffer wraparounds required after warm-up before detection arms.
    pub settle_wraps: u32,
    pub baseline: BaselineCfg,
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
            baseline: BaselineCfg::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BehaviorCfg {
    /// Begin in a fixed rotation until the first sighting.
    pub startup_rotate: bool,
    pub startup_rotation: Rotation,
    /// Rotation used while searching with no last-known side.
    pub search_rotation: Rotation,
    /// Escape rotation when front and rear corners fire on both sides.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DriveCfg {
    /// Full wheel speed in encoder ticks per control interval.
    pub max_tick_speed: f32,
    /// Fraction of `max_tick_speed` used for straight runs and spins.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PiCfg {
    pub kp: f32,
    pub ki: f32,
    pub update_interval_ms: u64,
    /// Multiplier turning ticks per elapsed ms into ticks per interval.
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Control loop rate.
    pub tick_hz: u32,
    /// Ceiling on the ultrasonic echo wait; ~15 ms is about 2 m of range.
    pub echo_timeout_us: u64,
    /// Minimum spacing between status frames.
    pub status_every_ms: u64,
    /// Countdown before a competition run starts moving.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LineCfg {
    /// Explicit threshold table; overrides both the store and the defaults.
    pub thresholds: Option<Vec<i32>>,
    /// CSV file holding the persisted threshold table.
    pub store: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub fusion: FusionCfg,
    #[serde(default)]
    pub behavior: BehaviorCfg,
    #[serde(default)]
    pub drive: DriveCfg,
    #[serde(default)]
    pub pi: PiCfg,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub line: LineCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Fusion
        let f = &self.fusion;
        if !(2..=64).contains(&f.buffer_size) {
            eyre::bail!("fusion.buffer_size must be in [2, 64]");
        }
        if f.detection_threshold_cm <= 0 {
            eyre::bail!("fusion.detection_threshold_cm must be > 0");
        }
        if f.track_threshold_cm <= 0 {
            eyre::bail!("fusion.track_threshold_cm must be > 0");
        }
        if f.detect_required == 0 {
            eyre::bail!("fusion.detect_required must be >= 1");
        }
        if f.lost_required == 0 {
            eyre::bail!("fusion.lost_required must be >= 1");
        }
        if f.warmup_ms > 60_000 {
            eyre::bail!("fusion.warmup_ms is unreasonably large (>60s)");
        }
        if f.settle_wraps == 0 {
            eyre::bail!("fusion.settle_wraps must be >= 1");
        }
        if f.baseline.measured_samples == 0 && f.baseline.fixed_cm <= 0 {
            eyre::bail!("fusion.baseline.fixed_cm must be > 0");
        }
        if f.baseline.fallback_cm <= 0 {
            eyre::bail!("fusion.baseline.fallback_cm must be > 0");
        }

        // Behavior
        if self.behavior.edge_backoff_ms == 0 {
            eyre::bail!("behavior.edge_backoff_ms must be >= 1");
        }
        if self.behavior.edge_backoff_ms > 10_000 {
            eyre::bail!("behavior.edge_backoff_ms is unreasonably large (>10s)");
        }

        // Drive
        if !(self.drive.max_tick_speed.is_finite() && self.drive.max_tick_speed > 0.0) {
            eyre::bail!("drive.max_tick_speed must be > 0");
        }
        if !(self.drive.cruise_fraction > 0.0 && self.drive.cruise_fraction <= 1.0) {
            eyre::bail!("drive.cruise_fraction must be in (0.0, 1.0]");
        }

        // PI
        if !(self.pi.kp.is_finite() && self.pi.kp >= 0.0) {
            eyre::bail!("pi.kp must be >= 0");
        }
        if !(self.pi.ki.is_finite() && self.pi.ki >= 0.0) {
            eyre::bail!("pi.ki must be >= 0");
        }
        if self.pi.update_interval_ms == 0 {
            eyre::bail!("pi.update_interval_ms must be >= 1");
        }
        if !(self.pi.velocity_scale.is_finite() && self.pi.velocity_scale > 0.0) {
            eyre::bail!("pi.velocity_scale must be > 0");
        }

        // Timing
        if self.timing.tick_hz == 0 {
            eyre::bail!("timing.tick_hz must be > 0");
        }
        if self.timing.echo_timeout_us == 0 {
            eyre::bail!("timing.echo_timeout_us must be >= 1");
        }
        if self.timing.countdown_s > 60 {
            eyre::bail!("timing.countdown_s is unreasonably large (>60s)");
        }

        // Line
        if let Some(t) = &self.line.thresholds {
            validate_thresholds(t)?;
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be never, daily or hourly, got '{r}'");
        }

        Ok(())
    }
}

/// A threshold table must hold 16 strictly ascending levels within the ADC range.
pub fn validate_thresholds(t: &[i32]) -> eyre::Result<()> {
    if t.len() != 16 {
        eyre::bail!("line.thresholds must have 16 entries, got {}", t.len());
    }
    if t.windows(2).any(|w| w[0] >= w[1]) {
        eyre::bail!("line.thresholds must be strictly ascending");
    }
    if t[0] <= 0 || t[15] > ADC_FULL_SCALE {
        eyre::bail!("line.thresholds must lie in (0, {ADC_FULL_SCALE}]");
    }
    Ok(())
}
