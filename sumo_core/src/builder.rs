//! Type-state builder for `Robot` and generic `build_robot` constructor.
//!
//! The builder enforces at compile time that the range sensor, drive motors
//! and encoders are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use sumo_traits::{Clock, DriveMotors, Encoders, LineSensor, MonotonicClock, RangeSensor, Side, StatusSink};

use crate::behavior::{BehaviorMachine, RobotState};
use crate::config::*;
use crate::drive::VelocityController;
use crate::error::{BuildError, Result};
use crate::fusion::SensorFusion;
use crate::line::LineThresholds;
use crate::mocks::NoLineSensor;
use crate::robot::{RobotCore, TickOutcome};
use crate::telemetry::TelemetryFeed;
use crate::types::{EdgeFlags, MotorIntent, RangeSample};

/// Tuning for every component of the core.
#[derive(Debug, Clone, Default)]
pub struct RobotSettings {
    pub fusion: FusionCfg,
    pub behavior: BehaviorCfg,
    pub drive: DriveCfg,
    pub pi: PiCfg,
    pub timing: Timing,
    pub thresholds: LineThresholds,
}

impl From<&sumo_config::Config> for RobotSettings {
    /// Thresholds come from `[line].thresholds` when set; loading the
    /// persisted table is left to the caller.
    fn from(c: &sumo_config::Config) -> Self {
        let thresholds = c
            .line
            .thresholds
            .as_deref()
            .and_then(|t| LineThresholds::from_slice(t).ok())
            .unwrap_or_default();
        Self {
            fusion: FusionCfg::from(&c.fusion),
            behavior: BehaviorCfg::from(&c.behavior),
            drive: DriveCfg::from(&c.drive),
            pi: PiCfg::from(&c.pi),
            timing: Timing::from(&c.timing),
            thresholds,
        }
    }
}

// ── Public dynamic-dispatch wrapper ──────────────────────────────────────────

type BoxedCore = RobotCore<
    Box<dyn RangeSensor>,
    Box<dyn LineSensor>,
    Box<dyn DriveMotors>,
    Box<dyn Encoders>,
>;

/// Robot with boxed collaborators.
pub struct Robot {
    pub(crate) inner: BoxedCore,
}

impl core::fmt::Debug for Robot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Robot")
            .field("state", &self.inner.state())
            .field("ticks", &self.inner.ticks())
            .finish()
    }
}

impl Robot {
    /// Start building a Robot.
    pub fn builder() -> RobotBuilder<Missing, Missing, Missing> {
        RobotBuilder::default()
    }

    pub fn state(&self) -> RobotState {
        self.inner.state()
    }

    pub fn thresholds(&self) -> &LineThresholds {
        self.inner.thresholds()
    }

    pub fn timing(&self) -> &Timing {
        self.inner.timing()
    }

    pub fn behavior(&self) -> &BehaviorMachine {
        self.inner.behavior()
    }

    pub fn fusion(&self) -> &SensorFusion {
        self.inner.fusion()
    }

    pub fn duty(&self) -> [u8; 2] {
        self.inner.velocity().duty()
    }

    pub fn encoders(&self) -> &dyn Encoders {
        &**self.inner.encoders()
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        self.inner.clock()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.inner.elapsed_ms()
    }

    pub fn ticks(&self) -> u64 {
        self.inner.ticks()
    }

    /// Reset per-run state. Call before a new round.
    pub fn begin(&mut self) {
        self.inner.begin();
    }

    /// One iteration of the control loop.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        self.inner.tick()
    }

    /// Brake both wheels (best-effort callers log the error).
    pub fn stop(&mut self) -> Result<()> {
        self.inner.stop()
    }

    pub fn read_ranges(&mut self) -> RangeSample {
        self.inner.read_ranges()
    }

    pub fn read_edges(&mut self) -> EdgeFlags {
        self.inner.read_edges()
    }

    pub fn drive_fixed(&mut self, intent: MotorIntent) -> Result<Option<[u8; 2]>> {
        self.inner.drive_fixed(intent)
    }

    pub fn announce(&mut self, text: &str) {
        self.inner.announce(text);
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `Robot`. All fields are validated on `build()`.
pub struct RobotBuilder<R, M, E> {
    range: Option<Box<dyn RangeSensor>>,
    motors: Option<Box<dyn DriveMotors>>,
    encoders: Option<Box<dyn Encoders>>,
    line: Option<Box<dyn LineSensor>>,
    settings: RobotSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    status: Option<Box<dyn StatusSink>>,
    telemetry: Option<TelemetryFeed>,
    _r: PhantomData<R>,
    _m: PhantomData<M>,
    _e: PhantomData<E>,
}

impl Default for RobotBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            range: None,
            motors: None,
            encoders: None,
            line: None,
            settings: RobotSettings::default(),
            clock: None,
            status: None,
            telemetry: None,
            _r: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct a `RobotCore`.
///
/// Single source of truth for validation and construction, used by both
/// `RobotBuilder::try_build()` and `build_robot()`.
#[allow(clippy::too_many_arguments)]
fn validate_and_build<R, L, M, E>(
    range: R,
    line: L,
    motors: M,
    encoders: E,
    settings: RobotSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    status: Option<Box<dyn StatusSink>>,
    telemetry: Option<TelemetryFeed>,
) -> Result<RobotCore<R, L, M, E>>
where
    R: RangeSensor,
    L: LineSensor,
    M: DriveMotors,
    E: Encoders,
{
    let RobotSettings {
        fusion,
        behavior,
        drive,
        pi,
        timing,
        thresholds,
    } = settings;

    // ── Validation ───────────────────────────────────────────────────────────
    if fusion.buffer_size < 2 {
        return Err(invalid("buffer_size must be >= 2"));
    }
    if fusion.detect_required == 0 || fusion.lost_required == 0 {
        return Err(invalid("detect_required and lost_required must be >= 1"));
    }
    if fusion.detection_threshold_cm <= 0 || fusion.track_threshold_cm <= 0 {
        return Err(invalid("distance thresholds must be > 0"));
    }
    match fusion.baseline {
        BaselineMode::Fixed(cm) if cm <= 0 => return Err(invalid("baseline must be > 0")),
        BaselineMode::Measured { fallback, .. } if fallback <= 0 => {
            return Err(invalid("baseline fallback must be > 0"));
        }
        _ => {}
    }
    if behavior.edge_backoff_ms == 0 {
        return Err(invalid("edge_backoff_ms must be >= 1"));
    }
    if !(drive.max_tick_speed.is_finite() && drive.max_tick_speed > 0.0) {
        return Err(invalid("max_tick_speed must be > 0"));
    }
    if !(drive.cruise_fraction > 0.0 && drive.cruise_fraction <= 1.0) {
        return Err(invalid("cruise_fraction must be in (0, 1]"));
    }
    if !(pi.kp.is_finite() && pi.ki.is_finite()) || pi.kp < 0.0 || pi.ki < 0.0 {
        return Err(invalid("PI gains must be finite and >= 0"));
    }
    if pi.update_interval_ms == 0 {
        return Err(invalid("update_interval_ms must be >= 1"));
    }
    if timing.tick_hz == 0 {
        return Err(invalid("tick_hz must be > 0"));
    }
    if timing.echo_timeout_us == 0 {
        return Err(invalid("echo_timeout_us must be >= 1"));
    }

    let clock: Arc<dyn Clock + Send + Sync> = match clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    Ok(RobotCore {
        range,
        line,
        encoders,
        velocity: VelocityController::new(motors, pi),
        thresholds,
        fusion: SensorFusion::new(fusion),
        behavior: BehaviorMachine::new(behavior, drive),
        timing,
        clock,
        epoch,
        sample: RangeSample::default(),
        next_side: Side::Left,
        status,
        telemetry,
        last_status_ms: None,
        ticks: 0,
    })
}

impl<R, M, E> RobotBuilder<R, M, E> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<Robot> {
        let range = self
            .range
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRange))?;
        let motors = self
            .motors
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotors))?;
        let encoders = self
            .encoders
            .ok_or_else(|| eyre::Report::new(BuildError::MissingEncoders))?;
        let line = self
            .line
            .unwrap_or_else(|| Box::new(NoLineSensor) as Box<dyn LineSensor>);

        let inner = validate_and_build(
            range,
            line,
            motors,
            encoders,
            self.settings,
            self.clock,
            self.status,
            self.telemetry,
        )?;
        Ok(Robot { inner })
    }

    /// Rebuild with different type-state markers; fields carry over unchanged.
    fn retag<R2, M2, E2>(self) -> RobotBuilder<R2, M2, E2> {
        RobotBuilder {
            range: self.range,
            motors: self.motors,
            encoders: self.encoders,
            line: self.line,
            settings: self.settings,
            clock: self.clock,
            status: self.status,
            telemetry: self.telemetry,
            _r: PhantomData,
            _m: PhantomData,
            _e: PhantomData,
        }
    }
}

/// Chainable setters that do not affect type-state.
impl<R, M, E> RobotBuilder<R, M, E> {
    pub fn with_settings(mut self, settings: RobotSettings) -> Self {
        self.settings = settings;
        self
    }
    pub fn with_fusion(mut self, fusion: FusionCfg) -> Self {
        self.settings.fusion = fusion;
        self
    }
    pub fn with_behavior(mut self, behavior: BehaviorCfg) -> Self {
        self.settings.behavior = behavior;
        self
    }
    pub fn with_drive(mut self, drive: DriveCfg) -> Self {
        self.settings.drive = drive;
        self
    }
    pub fn with_pi(mut self, pi: PiCfg) -> Self {
        self.settings.pi = pi;
        self
    }
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.settings.timing = timing;
        self
    }
    pub fn with_thresholds(mut self, thresholds: LineThresholds) -> Self {
        self.settings.thresholds = thresholds;
        self
    }
    /// Without a line sensor the robot never sees an edge.
    pub fn with_line_sensor(mut self, line: impl LineSensor + 'static) -> Self {
        self.line = Some(Box::new(line));
        self
    }
    pub fn with_status_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.status = Some(Box::new(sink));
        self
    }
    pub fn with_telemetry(mut self, feed: TelemetryFeed) -> Self {
        self.telemetry = Some(feed);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<M, E> RobotBuilder<Missing, M, E> {
    pub fn with_range_sensor(
        mut self,
        range: impl RangeSensor + 'static,
    ) -> RobotBuilder<Set, M, E> {
        self.range = Some(Box::new(range));
        self.retag()
    }
}

impl<R, E> RobotBuilder<R, Missing, E> {
    pub fn with_motors(mut self, motors: impl DriveMotors + 'static) -> RobotBuilder<R, Set, E> {
        self.motors = Some(Box::new(motors));
        self.retag()
    }
}

impl<R, M> RobotBuilder<R, M, Missing> {
    pub fn with_encoders(mut self, encoders: impl Encoders + 'static) -> RobotBuilder<R, M, Set> {
        self.encoders = Some(Box::new(encoders));
        self.retag()
    }
}

impl RobotBuilder<Set, Set, Set> {
    /// Validate and build the Robot. Only available when range sensor,
    /// motors and encoders are set.
    pub fn build(self) -> Result<Robot> {
        self.try_build()
    }
}

/// Build a generic, statically-dispatched `RobotCore` from concrete parts.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_robot<R, L, M, E>(
    range: R,
    line: L,
    motors: M,
    encoders: E,
    settings: RobotSettings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<RobotCore<R, L, M, E>>
where
    R: RangeSensor,
    L: LineSensor,
    M: DriveMotors,
    E: Encoders,
{
    validate_and_build(range, line, motors, encoders, settings, clock, None, None)
}
