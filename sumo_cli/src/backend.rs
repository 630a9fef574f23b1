//! Collaborator assembly: the simulated robot by default, rppal drivers with
//! the `hardware` feature on Linux.
//!
//! The simulator is scripted through the environment:
//!
//! | Variable | Effect |
//! |---|---|
//! | `SUMO_SIM_RANGE` | `l,r;l,r;...` range pairs in cm, one per tick, last repeats (`-1` = out of range) |
//! | `SUMO_SIM_LINE` | `raw,raw,...` line ADC levels, one per tick, last repeats |
//! | `SUMO_SIM_FAST=1` | drive the loop from a manual clock so pacing sleeps cost nothing |
//! | `SUMO_SIM_FAULT=motors` | make every motor command fail |

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use sumo_config::{Config, CsvSettingsStore};
use sumo_core::builder::{Missing, RobotBuilder};
use sumo_core::error::SumoError;
use sumo_core::{LineThresholds, Robot};

/// Threshold table in effect: `[line].thresholds`, else the persisted store,
/// else the defaults.
pub fn resolve_thresholds(cfg: &Config, config_path: &Path) -> eyre::Result<LineThresholds> {
    if let Some(t) = &cfg.line.thresholds {
        return LineThresholds::from_slice(t);
    }
    match store_path(cfg, config_path) {
        Some(path) => {
            let mut store = CsvSettingsStore::open(&path)?;
            LineThresholds::load(&mut store)
                .wrap_err_with(|| format!("loading line thresholds from {}", path.display()))
        }
        None => Ok(LineThresholds::default()),
    }
}

/// `[line].store`, resolved against the config file's directory.
pub fn store_path(cfg: &Config, config_path: &Path) -> Option<PathBuf> {
    let raw = Path::new(cfg.line.store.as_deref()?);
    if raw.is_absolute() {
        return Some(raw.to_path_buf());
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    Some(base.join(raw))
}

pub fn open_store(cfg: &Config, config_path: &Path) -> eyre::Result<CsvSettingsStore> {
    let Some(path) = store_path(cfg, config_path) else {
        return Err(eyre::Report::new(SumoError::Config(
            "line.store is not set in the config".into(),
        )));
    };
    CsvSettingsStore::open(path)
}

/// Wire range sensors, line sensor, motors, encoders and clock into `builder`.
pub fn assemble(builder: RobotBuilder<Missing, Missing, Missing>, cfg: &Config) -> eyre::Result<Robot> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        hardware::assemble(builder, cfg)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg; // pins are unused by the simulator
        sim::assemble(builder)
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod hardware {
    use super::*;
    use sumo_hardware::hardware::{EncoderInputs, HBridge, Mcp3008Line, UltrasonicPair};

    pub fn assemble(
        builder: RobotBuilder<Missing, Missing, Missing>,
        cfg: &Config,
    ) -> eyre::Result<Robot> {
        let p = &cfg.pins;
        let range = UltrasonicPair::new(p.left_trigger, p.left_echo, p.right_trigger, p.right_echo)
            .wrap_err("open ultrasonic pins")?;
        let line = Mcp3008Line::new(p.line_adc_channel).wrap_err("open MCP3008 line sensor")?;
        let motors = HBridge::new(p.in1a, p.in2a, p.pwm_a, p.in1b, p.in2b, p.pwm_b)
            .wrap_err("open motor pins")?;
        let encoders = EncoderInputs::new(p.encoder_a, p.encoder_b).wrap_err("open encoder pins")?;
        tracing::info!("hardware backend ready");
        builder
            .with_range_sensor(range)
            .with_line_sensor(line)
            .with_motors(motors)
            .with_encoders(encoders)
            .build()
    }
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
mod sim {
    use super::*;
    use std::sync::Arc;
    use sumo_hardware::{HwError, SimulatedDrive, SimulatedLine, SimulatedPlant, SimulatedRange};
    use sumo_traits::{Clock, DriveMode, DriveMotors, ManualClock, MonotonicClock, Wheel};

    /// Encoder edges per ms at full duty; ~12 ticks per 500 ms at half duty,
    /// close to the cruise target.
    const EDGES_PER_MS_AT_FULL: f64 = 0.05;

    fn env_flag(name: &str) -> bool {
        std::env::var(name).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    }

    fn parse_cm(s: &str) -> eyre::Result<i32> {
        s.trim()
            .parse::<i32>()
            .map_err(|e| eyre::eyre!("bad distance '{s}': {e}"))
    }

    pub(super) fn parse_range_script(s: &str) -> eyre::Result<Vec<(i32, i32)>> {
        s.split(';')
            .filter(|p| !p.trim().is_empty())
            .map(|pair| {
                let (l, r) = pair
                    .split_once(',')
                    .ok_or_else(|| eyre::eyre!("expected 'left,right', got '{pair}'"))?;
                Ok((parse_cm(l)?, parse_cm(r)?))
            })
            .collect()
    }

    pub(super) fn parse_line_script(s: &str) -> eyre::Result<Vec<u16>> {
        s.split(',')
            .filter(|v| !v.trim().is_empty())
            .map(|v| {
                v.trim()
                    .parse::<u16>()
                    .map_err(|e| eyre::eyre!("bad ADC level '{v}': {e}"))
            })
            .collect()
    }

    /// Motor driver whose every command fails.
    struct FaultyDrive;

    impl DriveMotors for FaultyDrive {
        fn set_direction(
            &mut self,
            _wheel: Wheel,
            _mode: DriveMode,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err(Box::new(HwError::Gpio("simulated H-bridge fault".into())))
        }

        fn set_duty(
            &mut self,
            _wheel: Wheel,
            _duty: u8,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err(Box::new(HwError::Pwm("simulated H-bridge fault".into())))
        }
    }

    pub fn assemble(builder: RobotBuilder<Missing, Missing, Missing>) -> eyre::Result<Robot> {
        let script = match std::env::var("SUMO_SIM_RANGE") {
            Ok(s) => parse_range_script(&s).wrap_err("SUMO_SIM_RANGE")?,
            Err(_) => Vec::new(),
        };
        let levels = match std::env::var("SUMO_SIM_LINE") {
            Ok(s) => parse_line_script(&s).wrap_err("SUMO_SIM_LINE")?,
            Err(_) => Vec::new(),
        };
        let fast = env_flag("SUMO_SIM_FAST");
        let clock: Arc<dyn Clock + Send + Sync> = if fast {
            Arc::new(ManualClock::new())
        } else {
            Arc::new(MonotonicClock::new())
        };
        let plant = SimulatedPlant::new(clock.clone(), EDGES_PER_MS_AT_FULL);
        let motors: Box<dyn DriveMotors> =
            if std::env::var("SUMO_SIM_FAULT").is_ok_and(|v| v == "motors") {
                Box::new(FaultyDrive)
            } else {
                Box::new(SimulatedDrive::new(plant.clone()))
            };
        tracing::info!(pairs = script.len(), levels = levels.len(), fast, "simulated backend ready");

        builder
            .with_range_sensor(SimulatedRange::scripted(script))
            .with_line_sensor(SimulatedLine::scripted(levels))
            .with_motors(motors)
            .with_encoders(plant)
            .with_clock(Box::new(clock))
            .build()
    }
}

#[cfg(all(test, not(all(feature = "hardware", target_os = "linux"))))]
mod tests {
    use super::sim::{parse_line_script, parse_range_script};

    #[test]
    fn range_script_parses_pairs_and_dropouts() {
        let s = parse_range_script("40,40; -1,60;").unwrap();
        assert_eq!(s, vec![(40, 40), (-1, 60)]);
        assert!(parse_range_script("40").is_err());
        assert!(parse_range_script("a,b").is_err());
    }

    #[test]
    fn line_script_parses_levels() {
        assert_eq!(parse_line_script("0, 3000,0").unwrap(), vec![0, 3000, 0]);
        assert!(parse_line_script("-5").is_err());
    }
}
