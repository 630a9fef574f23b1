//! The control tick (`RobotCore`).
//!
//! Each tick polls both range sensors and the line ladder, fuses the readings,
//! steps the state machine, applies its command to the velocity controller and
//! runs the PI update when due. Sensor read failures degrade to "nothing seen";
//! only actuator failures leave `tick` as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sumo_traits::{Clock, DriveMotors, Encoders, LineSensor, OUT_OF_RANGE, RangeSensor, Side, StatusSink};

use crate::behavior::{BehaviorMachine, RobotState};
use crate::config::Timing;
use crate::drive::VelocityController;
use crate::error::Result;
use crate::fusion::{FusedReport, SensorFusion};
use crate::hw_error::map_hw_error;
use crate::line::LineThresholds;
use crate::telemetry::{TelemetryFeed, TelemetryFrame};
use crate::types::{Command, EdgeFlags, RangeSample};
use crate::util::interval_due;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub elapsed_ms: u64,
    pub state: RobotState,
    pub command: Command,
    pub report: FusedReport,
    /// Duties written by the PI update, if it ran this tick.
    pub duty: Option<[u8; 2]>,
}

/// Unified core for both dynamic (boxed) and generic (static dispatch) variants.
pub struct RobotCore<R, L, M, E>
where
    R: RangeSensor,
    L: LineSensor,
    M: DriveMotors,
    E: Encoders,
{
    pub(crate) range: R,
    pub(crate) line: L,
    pub(crate) encoders: E,
    pub(crate) velocity: VelocityController<M>,
    pub(crate) thresholds: LineThresholds,
    pub(crate) fusion: SensorFusion,
    pub(crate) behavior: BehaviorMachine,
    pub(crate) timing: Timing,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) sample: RangeSample,
    pub(crate) next_side: Side,
    pub(crate) status: Option<Box<dyn StatusSink>>,
    pub(crate) telemetry: Option<TelemetryFeed>,
    pub(crate) last_status_ms: Option<u64>,
    pub(crate) ticks: u64,
}

impl<R, L, M, E> core::fmt::Debug for RobotCore<R, L, M, E>
where
    R: RangeSensor,
    L: LineSensor,
    M: DriveMotors,
    E: Encoders,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RobotCore")
            .field("state", &self.behavior.state())
            .field("sample", &self.sample)
            .field("armed", &self.fusion.armed())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl<R, L, M, E> RobotCore<R, L, M, E>
where
    R: RangeSensor,
    L: LineSensor,
    M: DriveMotors,
    E: Encoders,
{
    pub fn state(&self) -> RobotState {
        self.behavior.state()
    }

    pub fn thresholds(&self) -> &LineThresholds {
        &self.thresholds
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn fusion(&self) -> &SensorFusion {
        &self.fusion
    }

    pub fn behavior(&self) -> &BehaviorMachine {
        &self.behavior
    }

    pub fn velocity(&self) -> &VelocityController<M> {
        &self.velocity
    }

    pub fn encoders(&self) -> &E {
        &self.encoders
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    /// Latest range pair.
    pub fn sample(&self) -> RangeSample {
        self.sample
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Milliseconds since `begin`.
    pub fn elapsed_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Reset per-run state. Call while the motors are idle, before the first
    /// tick of a round.
    pub fn begin(&mut self) {
        if let Err(e) = self.velocity.halt() {
            tracing::warn!(error = %e, "halt failed during begin");
        }
        self.encoders.reset();
        self.epoch = self.clock.now();
        self.fusion.begin();
        self.behavior.begin();
        self.velocity.rebase(0, &self.encoders);
        self.sample = RangeSample::default();
        self.next_side = Side::Left;
        self.last_status_ms = None;
        self.ticks = 0;
        tracing::info!(state = %self.behavior.state(), "round start");
    }

    /// Poll one range sensor. A failed poll marks the expected side as out
    /// of range.
    fn poll_range(&mut self, timeout: Duration) {
        match self.range.poll(timeout) {
            Ok((side, cm)) => {
                self.sample.set(side, cm);
                self.next_side = side.other();
            }
            Err(e) => {
                let side = self.next_side;
                tracing::warn!(error = %map_hw_error(&*e), ?side, "range poll failed");
                self.sample.set(side, OUT_OF_RANGE);
                self.next_side = side.other();
            }
        }
    }

    /// Read and decode the line ladder; a failed read means no edge.
    pub fn read_edges(&mut self) -> EdgeFlags {
        match self.line.read_raw() {
            Ok(raw) => self.thresholds.flags(raw),
            Err(e) => {
                tracing::warn!(error = %map_hw_error(&*e), "line read failed");
                EdgeFlags::default()
            }
        }
    }

    /// Take a fresh range pair (two polls).
    pub fn read_ranges(&mut self) -> RangeSample {
        let timeout = Duration::from_micros(self.timing.echo_timeout_us);
        self.poll_range(timeout);
        self.poll_range(timeout);
        self.sample
    }

    /// One control iteration.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.elapsed_ms();
        let sample = self.read_ranges();
        let edge = self.read_edges();

        let report = self.fusion.update(sample, edge, now);
        let command = self.behavior.step(&report, self.fusion.hysteresis_mut(), now);
        match command {
            Command::Drive(intent) => self.velocity.apply_intent(intent)?,
            Command::Stop => self.velocity.brake()?,
        }
        let duty = self.velocity.update(now, &self.encoders)?;

        self.ticks += 1;
        tracing::trace!(
            tick = self.ticks,
            left_cm = sample.left_cm,
            right_cm = sample.right_cm,
            edge = edge.code(),
            state = %self.behavior.state(),
            "tick"
        );
        self.publish_status(now, &report);

        Ok(TickOutcome {
            elapsed_ms: now,
            state: self.behavior.state(),
            command,
            report,
            duty,
        })
    }

    /// Current telemetry snapshot.
    pub fn frame(&self, elapsed_ms: u64, report: &FusedReport) -> TelemetryFrame {
        let h = self.fusion.hysteresis();
        TelemetryFrame {
            elapsed_ms,
            state: self.behavior.state(),
            left_cm: self.sample.left_cm,
            right_cm: self.sample.right_cm,
            avg_cm: report.current_cm,
            baseline_cm: report.baseline_cm,
            buffer_mean: report.buffer_mean,
            buffer_filled: report.buffer_filled,
            armed: report.armed,
            detect: (h.detect().value(), h.detect().required()),
            lost: (h.lost_counter().value(), h.lost_counter().required()),
            opponent_side: report.opponent_side,
            edge_code: report.edge.code(),
            duty: self.velocity.duty(),
        }
    }

    fn publish_status(&mut self, now: u64, report: &FusedReport) {
        if self.status.is_none() && self.telemetry.is_none() {
            return;
        }
        if !interval_due(self.last_status_ms, now, self.timing.status_every_ms) {
            return;
        }
        self.last_status_ms = Some(now);
        let frame = self.frame(now, report);
        if let Some(sink) = self.status.as_mut() {
            sink.publish(&frame.to_string());
        }
        if let Some(feed) = &self.telemetry {
            feed.offer(frame);
        }
    }

    /// Write free text to the status sink, if any.
    pub fn announce(&mut self, text: &str) {
        if let Some(sink) = self.status.as_mut() {
            sink.publish(text);
        }
    }

    /// Brake and zero both wheels.
    pub fn stop(&mut self) -> Result<()> {
        self.velocity.halt()
    }

    /// Drive a fixed intent under PI control, bypassing fusion and behavior.
    /// Used by the motor bench check.
    pub fn drive_fixed(&mut self, intent: crate::types::MotorIntent) -> Result<Option<[u8; 2]>> {
        let now = self.elapsed_ms();
        self.velocity.apply_intent(intent)?;
        self.ticks += 1;
        self.velocity.update(now, &self.encoders)
    }
}
