#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Behavior core for a two-wheeled sumo robot (hardware-agnostic).
//!
//! All hardware goes through the traits in `sumo_traits`.
//!
//! ## Architecture
//!
//! - **Fusion** (`fusion`): alternating ultrasonic pairs and the 4-bit line
//!   code become a debounced [`FusedReport`], with a ring-buffer mean, a
//!   baseline for invalid readings and a warm-up guard.
//! - **Behavior** (`behavior`): STARTUP_ROTATE / SEARCHING / CHASING /
//!   AVOID_EDGE state machine emitting a [`Command`].
//! - **Drive** (`drive`): per-wheel incremental PI from encoder velocity to
//!   8-bit duty.
//! - **Robot** (`robot`, `runner`): the paced tick loop tying them together.
//!
//! Core decisions never fail. Sensor read errors degrade to "nothing seen";
//! only actuator errors surface, as `eyre` reports wrapping [`SumoError`].

pub mod baseline;
pub mod behavior;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod drive;
pub mod error;
pub mod fusion;
pub mod hw_error;
pub mod hysteresis;
pub mod line;
pub mod mocks;
pub mod ring;
pub mod robot;
pub mod runner;
pub mod telemetry;
pub mod types;
pub mod util;

pub use behavior::{BehaviorMachine, RobotState, escape_direction};
pub use builder::{Robot, RobotBuilder, RobotSettings, build_robot};
pub use config::{BaselineMode, BehaviorCfg, DriveCfg, FusionCfg, PiCfg, Timing};
pub use drive::{PiChannel, VelocityController, pi_output};
pub use error::{BuildError, SumoError};
pub use fusion::{FusedReport, SensorFusion};
pub use hysteresis::{DetectionHysteresis, SaturatingCounter};
pub use line::LineThresholds;
pub use ring::DistanceRing;
pub use robot::{RobotCore, TickOutcome};
pub use runner::{RunSummary, countdown, run};
pub use telemetry::{TelemetryFeed, TelemetryFrame};
pub use types::{Command, Direction, EdgeFlags, MotorIntent, OpponentSide, RangeSample, Rotation};
