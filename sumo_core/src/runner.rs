use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;

use crate::behavior::RobotState;
use crate::builder::Robot;
use crate::error::Result;
use crate::util::tick_period;

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub elapsed_ms: u64,
    pub final_state: RobotState,
    pub transitions: u64,
    /// True when the shutdown flag ended the round.
    pub interrupted: bool,
}

/// Announce a `secs`-second countdown on the status sink, one line per
/// second. Returns false if `shutdown` was raised meanwhile.
pub fn countdown(robot: &mut Robot, secs: u32, shutdown: &AtomicBool) -> bool {
    let clock = robot.clock().clone();
    for left in (1..=secs).rev() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        tracing::info!(seconds = left, "countdown");
        robot.announce(&format!("Starting in {left}..."));
        clock.sleep(Duration::from_secs(1));
    }
    !shutdown.load(Ordering::Relaxed)
}

/// Run one round: `begin`, then tick at `timing.tick_hz` until `shutdown` is
/// raised or `max_ticks` ticks have run. The wheels are stopped on the way
/// out, including when a tick fails.
pub fn run(robot: &mut Robot, shutdown: &AtomicBool, max_ticks: Option<u64>) -> Result<RunSummary> {
    let clock = robot.clock().clone();
    let period = tick_period(robot.timing().tick_hz);

    robot.begin();
    tracing::info!(tick_hz = robot.timing().tick_hz, ?max_ticks, "run start");

    let mut transitions = 0u64;
    let mut prev = robot.state();
    let mut interrupted = false;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            interrupted = true;
            break;
        }
        if max_ticks.is_some_and(|n| robot.ticks() >= n) {
            break;
        }

        let started = clock.now();
        let outcome = match robot.tick() {
            Ok(o) => o,
            Err(e) => {
                if let Err(stop_err) = robot.stop() {
                    tracing::warn!(error = %stop_err, "stop failed after tick error");
                }
                tracing::error!(error = %e, "control tick failed");
                return Err(e).wrap_err("control tick failed");
            }
        };
        if outcome.state != prev {
            transitions += 1;
            prev = outcome.state;
        }

        let spent = clock.now().saturating_duration_since(started);
        clock.sleep(period.saturating_sub(spent));
    }

    if let Err(e) = robot.stop() {
        tracing::warn!(error = %e, "stop failed at end of run");
    }
    let summary = RunSummary {
        ticks: robot.ticks(),
        elapsed_ms: robot.elapsed_ms(),
        final_state: robot.state(),
        transitions,
        interrupted,
    };
    tracing::info!(
        ticks = summary.ticks,
        elapsed_ms = summary.elapsed_ms,
        final_state = %summary.final_state,
        transitions,
        interrupted,
        "run stop"
    );
    Ok(summary)
}
