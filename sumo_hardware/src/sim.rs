//! Host-side stand-ins for the robot's sensors and drive train.
//!
//! `SimulatedPlant` couples the motors to the encoders: edges accrue in
//! proportion to the commanded duty over clock time, so the velocity loop
//! converges the same way it does on the floor.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use sumo_traits::{Clock, DriveMode, DriveMotors, Encoders, LineSensor, RangeSensor, Side, Wheel};

use crate::encoder::EncoderCounters;
use crate::ultrasonic::Alternator;

/// Replays a script of `(left_cm, right_cm)` pairs, one pair per two polls.
/// The last pair repeats forever.
#[derive(Debug, Clone)]
pub struct SimulatedRange {
    script: Vec<(i32, i32)>,
    pos: usize,
    alt: Alternator,
}

impl SimulatedRange {
    pub fn constant(left_cm: i32, right_cm: i32) -> Self {
        Self::scripted(vec![(left_cm, right_cm)])
    }

    /// An empty script behaves like an empty arena (both sides out of range).
    pub fn scripted(script: Vec<(i32, i32)>) -> Self {
        let script = if script.is_empty() {
            vec![(sumo_traits::OUT_OF_RANGE, sumo_traits::OUT_OF_RANGE)]
        } else {
            script
        };
        Self {
            script,
            pos: 0,
            alt: Alternator::default(),
        }
    }
}

impl RangeSensor for SimulatedRange {
    fn poll(
        &mut self,
        _timeout: Duration,
    ) -> Result<(Side, i32), Box<dyn std::error::Error + Send + Sync>> {
        let (l, r) = self.script[self.pos];
        let side = self.alt.advance();
        let cm = match side {
            Side::Left => l,
            Side::Right => {
                if self.pos + 1 < self.script.len() {
                    self.pos += 1;
                }
                r
            }
        };
        tracing::trace!(?side, cm, "simulated range poll");
        Ok((side, cm))
    }
}

/// Replays raw line-ladder levels, repeating the last one.
#[derive(Debug, Clone)]
pub struct SimulatedLine {
    levels: Vec<u16>,
    pos: usize,
}

impl SimulatedLine {
    pub fn constant(raw: u16) -> Self {
        Self::scripted(vec![raw])
    }

    pub fn scripted(levels: Vec<u16>) -> Self {
        let levels = if levels.is_empty() { vec![0] } else { levels };
        Self { levels, pos: 0 }
    }
}

impl LineSensor for SimulatedLine {
    fn read_raw(&mut self) -> Result<u16, Box<dyn std::error::Error + Send + Sync>> {
        let raw = self.levels[self.pos];
        if self.pos + 1 < self.levels.len() {
            self.pos += 1;
        }
        Ok(raw)
    }
}

#[derive(Debug)]
struct PlantState {
    last: Instant,
    duty: [u8; 2],
    mode: [DriveMode; 2],
    /// Fractional edges not yet credited to the counters.
    carry: [f64; 2],
}

/// Two wheels whose encoders advance at `edges_per_ms_at_full * duty / 255`
/// while driven, and not at all while braked.
#[derive(Debug)]
pub struct SimulatedPlant<C: Clock> {
    clock: C,
    edges_per_ms_at_full: f64,
    counters: EncoderCounters,
    state: Mutex<PlantState>,
}

impl<C: Clock> SimulatedPlant<C> {
    pub fn new(clock: C, edges_per_ms_at_full: f64) -> Arc<Self> {
        let last = clock.now();
        Arc::new(Self {
            clock,
            edges_per_ms_at_full: edges_per_ms_at_full.max(0.0),
            counters: EncoderCounters::new(),
            state: Mutex::new(PlantState {
                last,
                duty: [0; 2],
                mode: [DriveMode::Brake; 2],
                carry: [0.0; 2],
            }),
        })
    }

    pub fn duty(&self, wheel: Wheel) -> u8 {
        self.lock().duty[wheel.index()]
    }

    pub fn mode(&self, wheel: Wheel) -> DriveMode {
        self.lock().mode[wheel.index()]
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlantState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit the edges produced since the last call under the current drive.
    fn integrate(&self, st: &mut PlantState) {
        let now = self.clock.now();
        let dt_ms = now.saturating_duration_since(st.last).as_secs_f64() * 1000.0;
        st.last = now;
        for wheel in Wheel::ALL {
            let i = wheel.index();
            if st.mode[i] == DriveMode::Brake {
                st.carry[i] = 0.0;
                continue;
            }
            let edges = st.carry[i]
                + self.edges_per_ms_at_full * f64::from(st.duty[i]) / 255.0 * dt_ms;
            let whole = edges.floor();
            st.carry[i] = edges - whole;
            self.counters.record_edges(wheel, whole as u64);
        }
    }
}

impl<C: Clock> Encoders for SimulatedPlant<C> {
    fn read_count(&self, wheel: Wheel) -> u64 {
        let mut st = self.lock();
        self.integrate(&mut st);
        self.counters.read_count(wheel)
    }

    fn reset(&self) {
        let mut st = self.lock();
        self.integrate(&mut st);
        st.carry = [0.0; 2];
        self.counters.reset();
    }
}

/// Motor driver half of a [`SimulatedPlant`].
#[derive(Debug)]
pub struct SimulatedDrive<C: Clock> {
    plant: Arc<SimulatedPlant<C>>,
}

impl<C: Clock> SimulatedDrive<C> {
    pub fn new(plant: Arc<SimulatedPlant<C>>) -> Self {
        Self { plant }
    }
}

impl<C: Clock> DriveMotors for SimulatedDrive<C> {
    fn set_direction(
        &mut self,
        wheel: Wheel,
        mode: DriveMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.plant.lock();
        self.plant.integrate(&mut st);
        st.mode[wheel.index()] = mode;
        tracing::trace!(?wheel, ?mode, "simulated direction");
        Ok(())
    }

    fn set_duty(
        &mut self,
        wheel: Wheel,
        duty: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut st = self.plant.lock();
        self.plant.integrate(&mut st);
        st.duty[wheel.index()] = duty;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumo_traits::{ManualClock, OUT_OF_RANGE};

    #[test]
    fn range_script_advances_after_right_poll() {
        let mut r = SimulatedRange::scripted(vec![(100, 90), (20, 25)]);
        let t = Duration::from_millis(15);
        assert_eq!(r.poll(t).unwrap(), (Side::Left, 100));
        assert_eq!(r.poll(t).unwrap(), (Side::Right, 90));
        assert_eq!(r.poll(t).unwrap(), (Side::Left, 20));
        assert_eq!(r.poll(t).unwrap(), (Side::Right, 25));
        // last pair repeats
        assert_eq!(r.poll(t).unwrap(), (Side::Left, 20));
    }

    #[test]
    fn empty_range_script_is_out_of_range() {
        let mut r = SimulatedRange::scripted(Vec::new());
        let (_, cm) = r.poll(Duration::ZERO).unwrap();
        assert_eq!(cm, OUT_OF_RANGE);
    }

    #[test]
    fn plant_counts_only_while_driven() {
        let clock = ManualClock::new();
        let plant = SimulatedPlant::new(clock.clone(), 0.5);
        let mut drive = SimulatedDrive::new(Arc::clone(&plant));

        drive.set_direction(Wheel::Left, DriveMode::Forward).unwrap();
        drive.set_duty(Wheel::Left, 255).unwrap();
        drive.set_duty(Wheel::Right, 255).unwrap(); // still braked
        clock.advance_ms(100);

        assert_eq!(plant.read_count(Wheel::Left), 50);
        assert_eq!(plant.read_count(Wheel::Right), 0);

        plant.reset();
        assert_eq!(plant.read_count(Wheel::Left), 0);
    }

    #[test]
    fn brake_stops_counting_at_once_even_with_duty_left_on() {
        let clock = ManualClock::new();
        let plant = SimulatedPlant::new(clock.clone(), 0.5);
        let mut drive = SimulatedDrive::new(Arc::clone(&plant));

        drive.set_direction(Wheel::Left, DriveMode::Forward).unwrap();
        drive.set_duty(Wheel::Left, 255).unwrap();
        clock.advance_ms(40);
        drive.set_direction(Wheel::Left, DriveMode::Brake).unwrap();
        assert_eq!(plant.read_count(Wheel::Left), 20);

        clock.advance_ms(200);
        assert_eq!(plant.read_count(Wheel::Left), 20);
    }
}
