//! Closed-loop wheel velocity control.
//!
//! Each wheel runs an incremental PI law on encoder velocity. Direction pins
//! are set when an intent is applied; `update` only ever touches duty.

use eyre::WrapErr;
use sumo_traits::{DriveMode, DriveMotors, Encoders, Wheel};

use crate::config::PiCfg;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::types::MotorIntent;

/// One incremental PI step, clamped to the 8-bit duty range.
///
/// `out = prev + kp * (error - prev_error) + ki * (error + prev_error) / 2`
#[inline]
pub fn pi_output(prev_output: u8, prev_error: f32, error: f32, kp: f32, ki: f32) -> u8 {
    let out = f32::from(prev_output) + kp * (error - prev_error) + ki * (error + prev_error) / 2.0;
    if out.is_nan() {
        return prev_output;
    }
    out.round().clamp(0.0, 255.0) as u8
}

/// Per-wheel controller memory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PiChannel {
    pub prev_output: u8,
    pub prev_error: f32,
    last_count: u64,
}

impl PiChannel {
    /// Feed one encoder snapshot taken `elapsed_ms` after the previous one.
    /// A count that went backwards (reset) counts as no movement.
    pub fn step(&mut self, desired: f32, count: u64, elapsed_ms: u64, cfg: &PiCfg) -> u8 {
        let delta = count.saturating_sub(self.last_count);
        self.last_count = count;
        let elapsed = elapsed_ms.max(1) as f32;
        let velocity = cfg.velocity_scale * delta as f32 / elapsed;
        let error = desired - velocity;
        let out = pi_output(self.prev_output, self.prev_error, error, cfg.kp, cfg.ki);
        self.prev_output = out;
        self.prev_error = error;
        out
    }

    /// Zero output and error memory; the encoder snapshot is kept.
    pub fn clear(&mut self) {
        self.prev_output = 0;
        self.prev_error = 0.0;
    }

    pub fn rebase(&mut self, count: u64) {
        self.last_count = count;
    }
}

/// Owns the motor driver and both PI channels.
#[derive(Debug)]
pub struct VelocityController<M: DriveMotors> {
    motors: M,
    cfg: PiCfg,
    channels: [PiChannel; 2],
    intent: Option<MotorIntent>,
    modes: [Option<DriveMode>; 2],
    /// Duty last written per wheel.
    written: [u8; 2],
    /// Set by `brake`; the next intent restores the kept PI output.
    resume: bool,
    last_update_ms: u64,
}

impl<M: DriveMotors> VelocityController<M> {
    pub fn new(motors: M, cfg: PiCfg) -> Self {
        Self {
            motors,
            cfg,
            channels: [PiChannel::default(); 2],
            intent: None,
            modes: [None; 2],
            written: [0; 2],
            resume: false,
            last_update_ms: 0,
        }
    }

    pub fn cfg(&self) -> &PiCfg {
        &self.cfg
    }

    pub fn intent(&self) -> Option<&MotorIntent> {
        self.intent.as_ref()
    }

    pub fn channel(&self, wheel: Wheel) -> &PiChannel {
        &self.channels[wheel.index()]
    }

    /// Last duty written per wheel.
    pub fn duty(&self) -> [u8; 2] {
        self.written
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    pub fn motors_mut(&mut self) -> &mut M {
        &mut self.motors
    }

    /// Snapshot the encoders and restart the interval clock at `now_ms`.
    /// Call while idle (e.g. after an encoder reset).
    pub fn rebase(&mut self, now_ms: u64, encoders: &impl Encoders) {
        for wheel in Wheel::ALL {
            self.channels[wheel.index()].rebase(encoders.read_count(wheel));
        }
        self.last_update_ms = now_ms;
    }

    fn write_duty(&mut self, wheel: Wheel, duty: u8) -> Result<()> {
        self.motors
            .set_duty(wheel, duty)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("setting wheel duty")?;
        self.written[wheel.index()] = duty;
        Ok(())
    }

    fn set_mode(&mut self, wheel: Wheel, mode: DriveMode) -> Result<()> {
        if self.modes[wheel.index()] == Some(mode) {
            return Ok(());
        }
        self.motors
            .set_direction(wheel, mode)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("setting wheel direction")?;
        self.modes[wheel.index()] = Some(mode);
        Ok(())
    }

    /// Set direction pins for `intent` and load its target speeds.
    ///
    /// The first intent after a [`brake`](Self::brake) also writes each
    /// channel's kept output, so the wheels move before the next PI update.
    pub fn apply_intent(&mut self, intent: MotorIntent) -> Result<()> {
        let modes = intent.direction.wheel_modes();
        for wheel in Wheel::ALL {
            self.set_mode(wheel, modes[wheel.index()])?;
        }
        if self.resume {
            for wheel in Wheel::ALL {
                self.write_duty(wheel, self.channels[wheel.index()].prev_output)?;
            }
            self.resume = false;
        }
        if self.intent.map(|i| i.direction) != Some(intent.direction) {
            tracing::debug!(direction = intent.direction.label(), "motor intent");
        }
        self.intent = Some(intent);
        Ok(())
    }

    /// Run the PI law if at least `update_interval_ms` has passed since the
    /// last update. Returns the duties written, or `None` when skipped or
    /// halted.
    pub fn update(&mut self, now_ms: u64, encoders: &impl Encoders) -> Result<Option<[u8; 2]>> {
        let elapsed = now_ms.saturating_sub(self.last_update_ms);
        if elapsed < self.cfg.update_interval_ms {
            return Ok(None);
        }
        let Some(intent) = self.intent else {
            return Ok(None);
        };
        self.last_update_ms = now_ms;
        let desired = intent.desired();
        let mut out = [0u8; 2];
        for wheel in Wheel::ALL {
            let i = wheel.index();
            let count = encoders.read_count(wheel);
            out[i] = self.channels[i].step(desired[i], count, elapsed, &self.cfg);
            self.write_duty(wheel, out[i])?;
        }
        tracing::trace!(
            left = out[0],
            right = out[1],
            elapsed_ms = elapsed,
            "pi update"
        );
        Ok(Some(out))
    }

    /// Brake both wheels at duty 0. PI memory is untouched.
    pub fn brake(&mut self) -> Result<()> {
        self.intent = None;
        for wheel in Wheel::ALL {
            self.set_mode(wheel, DriveMode::Brake)?;
            self.write_duty(wheel, 0).wrap_err("zeroing wheel duty")?;
        }
        self.resume = true;
        Ok(())
    }

    /// Brake both wheels and clear both PI channels. Used at round
    /// boundaries.
    pub fn halt(&mut self) -> Result<()> {
        self.brake()?;
        for ch in &mut self.channels {
            ch.clear();
        }
        self.resume = false;
        Ok(())
    }
}
