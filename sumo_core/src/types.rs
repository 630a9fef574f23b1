//! Small value types passed between fusion, behavior and drive.

use sumo_traits::{DriveMode, OUT_OF_RANGE, Side};

use crate::config::DriveCfg;

/// Latest distance seen by each ultrasonic sensor, in centimetres.
///
/// One poll refreshes one side only; a fresh pair takes two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSample {
    pub left_cm: i32,
    pub right_cm: i32,
}

impl Default for RangeSample {
    fn default() -> Self {
        Self {
            left_cm: OUT_OF_RANGE,
            right_cm: OUT_OF_RANGE,
        }
    }
}

impl RangeSample {
    pub fn new(left_cm: i32, right_cm: i32) -> Self {
        Self { left_cm, right_cm }
    }

    pub fn set(&mut self, side: Side, cm: i32) {
        match side {
            Side::Left => self.left_cm = cm,
            Side::Right => self.right_cm = cm,
        }
    }

    /// Both readings are real distances.
    #[inline]
    pub fn both_valid(&self) -> bool {
        self.left_cm > 0 && self.right_cm > 0
    }

    /// Neither sensor saw anything.
    #[inline]
    pub fn both_out_of_range(&self) -> bool {
        self.left_cm <= 0 && self.right_cm <= 0
    }
}

/// Which line-sensor corners currently see the arena border.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeFlags {
    pub front_left: bool,
    pub front_right: bool,
    pub rear_left: bool,
    pub rear_right: bool,
}

impl EdgeFlags {
    /// Decode a 4-bit line code: bit3 front-left, bit2 front-right,
    /// bit1 rear-left, bit0 rear-right. Higher bits are ignored.
    pub fn from_code(code: u8) -> Self {
        Self {
            front_left: code & 0b1000 != 0,
            front_right: code & 0b0100 != 0,
            rear_left: code & 0b0010 != 0,
            rear_right: code & 0b0001 != 0,
        }
    }

    pub fn code(&self) -> u8 {
        (u8::from(self.front_left) << 3)
            | (u8::from(self.front_right) << 2)
            | (u8::from(self.rear_left) << 1)
            | u8::from(self.rear_right)
    }

    #[inline]
    pub fn any(&self) -> bool {
        self.front() || self.rear()
    }

    #[inline]
    pub fn front(&self) -> bool {
        self.front_left || self.front_right
    }

    #[inline]
    pub fn rear(&self) -> bool {
        self.rear_left || self.rear_right
    }

    #[inline]
    pub fn left(&self) -> bool {
        self.front_left || self.rear_left
    }

    #[inline]
    pub fn right(&self) -> bool {
        self.front_right || self.rear_right
    }
}

/// Side of the robot the opponent appears on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OpponentSide {
    Left,
    Right,
    /// Straight ahead, or unknown.
    #[default]
    None,
}

/// Rotation sense for search and escape spins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Rotation {
    Cw,
    #[default]
    Ccw,
}

impl Rotation {
    pub fn direction(self) -> Direction {
        match self {
            Rotation::Cw => Direction::RotateCw,
            Rotation::Ccw => Direction::RotateCcw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    /// Pivot left: left wheel idle, right wheel at full speed.
    Left,
    /// Pivot right: left wheel at full speed, right wheel idle.
    Right,
    RotateCw,
    RotateCcw,
}

impl Direction {
    /// H-bridge mode for `[left, right]` wheels. Idle wheels are braked.
    pub fn wheel_modes(self) -> [DriveMode; 2] {
        use DriveMode::{Brake, Forward, Reverse};
        match self {
            Direction::Forward => [Forward, Forward],
            Direction::Reverse => [Reverse, Reverse],
            Direction::Left => [Brake, Forward],
            Direction::Right => [Forward, Brake],
            Direction::RotateCw => [Forward, Reverse],
            Direction::RotateCcw => [Reverse, Forward],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Reverse => "REVERSE",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::RotateCw => "ROTATE_CW",
            Direction::RotateCcw => "ROTATE_CCW",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "forward" => Ok(Direction::Forward),
            "reverse" => Ok(Direction::Reverse),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            "rotate_cw" | "cw" => Ok(Direction::RotateCw),
            "rotate_ccw" | "ccw" => Ok(Direction::RotateCcw),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// A direction plus the per-wheel target speeds it implies, in encoder
/// ticks per control interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorIntent {
    pub direction: Direction,
    pub desired_left: f32,
    pub desired_right: f32,
}

impl MotorIntent {
    pub fn new(direction: Direction, drive: &DriveCfg) -> Self {
        let max = drive.max_tick_speed;
        let cruise = drive.cruise_fraction * max;
        let (desired_left, desired_right) = match direction {
            Direction::Forward
            | Direction::Reverse
            | Direction::RotateCw
            | Direction::RotateCcw => (cruise, cruise),
            Direction::Left => (0.0, max),
            Direction::Right => (max, 0.0),
        };
        Self {
            direction,
            desired_left,
            desired_right,
        }
    }

    #[inline]
    pub fn desired(&self) -> [f32; 2] {
        [self.desired_left, self.desired_right]
    }
}

/// Output of one behavior step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Drive(MotorIntent),
    /// Brake both wheels and drop the duty to zero.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_code_round_trips_every_code() {
        for code in 0u8..16 {
            assert_eq!(EdgeFlags::from_code(code).code(), code);
        }
    }

    #[test]
    fn diagonal_code_sets_front_left_and_rear_right() {
        let e = EdgeFlags::from_code(0b1001);
        assert!(e.front_left && e.rear_right);
        assert!(!e.front_right && !e.rear_left);
        assert!(e.front() && e.rear() && e.left() && e.right());
    }

    #[test]
    fn intents_follow_direction_table() {
        let drive = DriveCfg {
            max_tick_speed: 25.0,
            cruise_fraction: 0.5,
        };
        assert_eq!(MotorIntent::new(Direction::Forward, &drive).desired(), [12.5, 12.5]);
        assert_eq!(MotorIntent::new(Direction::RotateCw, &drive).desired(), [12.5, 12.5]);
        assert_eq!(MotorIntent::new(Direction::Left, &drive).desired(), [0.0, 25.0]);
        assert_eq!(MotorIntent::new(Direction::Right, &drive).desired(), [25.0, 0.0]);
    }

    #[test]
    fn parses_direction_names() {
        assert_eq!("rotate-cw".parse::<Direction>(), Ok(Direction::RotateCw));
        assert_eq!("Forward".parse::<Direction>(), Ok(Direction::Forward));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
