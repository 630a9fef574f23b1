//! Collaborator seams for the sumo behavior core.
//!
//! Everything that touches pins, timers or flash lives behind one of these
//! traits. Fallible calls return `Box<dyn Error + Send + Sync>` so drivers can
//! surface their own error types; the core maps them at the boundary.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::time::Duration;

/// Sentinel distance reported when an ultrasonic echo never arrives.
pub const OUT_OF_RANGE: i32 = -1;

/// Which of the two forward-facing range sensors produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Drive wheel. `Left` is channel A on the H-bridge, `Right` is channel B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    Left,
    Right,
}

impl Wheel {
    pub const ALL: [Wheel; 2] = [Wheel::Left, Wheel::Right];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Wheel::Left => 0,
            Wheel::Right => 1,
        }
    }
}

/// H-bridge input state for one wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Forward,
    Reverse,
    /// Both inputs low; the wheel is stopped and not driven at any duty.
    Brake,
}

pub trait RangeSensor {
    /// Fire the next sensor in the left/right rotation and return its side and
    /// distance in centimetres, or [`OUT_OF_RANGE`] when no echo arrived
    /// within `timeout`.
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Result<(Side, i32), Box<dyn std::error::Error + Send + Sync>>;
}

pub trait LineSensor {
    /// Raw ADC level of the four-corner resistor ladder.
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>>;
}

pub trait DriveMotors {
    fn set_direction(
        &mut self,
        wheel: Wheel,
        mode: DriveMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_duty(
        &mut self,
        wheel: Wheel,
        duty: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Wheel encoder counts, advanced from interrupt context.
pub trait Encoders {
    fn read_count(&self, wheel: Wheel) -> u64;
    /// Zero both counters. Only call while the velocity loop is idle.
    fn reset(&self);
}

/// Small key-value store used for calibration values.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<i32>;
    fn put(
        &mut self,
        key: &str,
        value: i32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Write-only status display.
pub trait StatusSink {
    fn publish(&mut self, text: &str);
}

impl<T: RangeSensor + ?Sized> RangeSensor for Box<T> {
    fn poll(
        &mut self,
        timeout: Duration,
    ) -> Result<(Side, i32), Box<dyn std::error::Error + Send + Sync>> {
        (**self).poll(timeout)
    }
}

impl<T: LineSensor + ?Sized> LineSensor for Box<T> {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_raw()
    }
}

impl<T: DriveMotors + ?Sized> DriveMotors for Box<T> {
    fn set_direction(
        &mut self,
        wheel: Wheel,
        mode: DriveMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_direction(wheel, mode)
    }
    fn set_duty(
        &mut self,
        wheel: Wheel,
        duty: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_duty(wheel, duty)
    }
}

impl<T: Encoders + ?Sized> Encoders for Box<T> {
    fn read_count(&self, wheel: Wheel) -> u64 {
        (**self).read_count(wheel)
    }
    fn reset(&self) {
        (**self).reset()
    }
}

impl<T: Encoders + ?Sized> Encoders for std::sync::Arc<T> {
    fn read_count(&self, wheel: Wheel) -> u64 {
        (**self).read_count(wheel)
    }
    fn reset(&self) {
        (**self).reset()
    }
}

impl<T: StatusSink + ?Sized> StatusSink for Box<T> {
    fn publish(&mut self, text: &str) {
        (**self).publish(text)
    }
}
