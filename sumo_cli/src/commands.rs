//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::WrapErr;
use serde_json::json;
use sumo_config::Config;
use sumo_core::line::CODE_LABELS;
use sumo_core::{
    Direction, LineThresholds, MotorIntent, Robot, RobotSettings, TelemetryFrame, countdown, runner,
    telemetry,
};
use sumo_core::util::tick_period;
use sumo_traits::{Clock, Encoders, StatusSink, Wheel};

use crate::backend;
use crate::cli::RtLock;
use crate::rt::setup_rt_once;

/// Inputs shared by every command.
pub struct Ctx<'a> {
    pub cfg: &'a Config,
    pub config_path: &'a Path,
    pub json: bool,
}

impl Ctx<'_> {
    fn settings(&self) -> eyre::Result<RobotSettings> {
        let mut settings = RobotSettings::from(self.cfg);
        settings.thresholds = backend::resolve_thresholds(self.cfg, self.config_path)?;
        Ok(settings)
    }

    fn robot(&self, settings: RobotSettings) -> eyre::Result<Robot> {
        backend::assemble(Robot::builder().with_settings(settings), self.cfg)
    }

    fn robot_with(
        &self,
        settings: RobotSettings,
        status: Option<ConsoleStatus>,
        feed: Option<telemetry::TelemetryFeed>,
    ) -> eyre::Result<Robot> {
        let mut builder = Robot::builder().with_settings(settings);
        if let Some(sink) = status {
            builder = builder.with_status_sink(sink);
        }
        if let Some(feed) = feed {
            builder = builder.with_telemetry(feed);
        }
        backend::assemble(builder, self.cfg)
    }
}

/// Status frames as plain text on stdout.
struct ConsoleStatus;

impl StatusSink for ConsoleStatus {
    fn publish(&mut self, text: &str) {
        println!("{text}");
    }
}

fn frame_json(f: &TelemetryFrame) -> serde_json::Value {
    json!({
        "type": "frame",
        "elapsed_ms": f.elapsed_ms,
        "state": f.state.label(),
        "left_cm": f.left_cm,
        "right_cm": f.right_cm,
        "avg_cm": f.avg_cm,
        "baseline_cm": f.baseline_cm,
        "buffer_mean": f.buffer_mean,
        "buffer_filled": f.buffer_filled,
        "armed": f.armed,
        "detect": [f.detect.0, f.detect.1],
        "lost": [f.lost.0, f.lost.1],
        "opponent_side": format!("{:?}", f.opponent_side),
        "edge_code": f.edge_code,
        "duty": f.duty,
    })
}

fn line_label(code: u8) -> &'static str {
    CODE_LABELS
        .get(usize::from(code))
        .copied()
        .unwrap_or("????")
}

pub fn run_round(
    ctx: &Ctx<'_>,
    ticks: Option<u64>,
    no_countdown: bool,
    rt: bool,
    rt_prio: Option<i32>,
    rt_lock: RtLock,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<()> {
    if rt {
        setup_rt_once(rt_prio, rt_lock);
    }
    let settings = ctx.settings()?;
    let countdown_s = settings.timing.countdown_s;

    // JSON mode streams frames from a reader thread; text mode prints them inline.
    let (mut robot, printer) = if ctx.json {
        let (feed, rx) = telemetry::channel(64);
        let printer = std::thread::spawn(move || {
            for frame in rx {
                println!("{}", frame_json(&frame));
            }
        });
        (ctx.robot_with(settings, None, Some(feed))?, Some(printer))
    } else {
        (ctx.robot_with(settings, Some(ConsoleStatus), None)?, None)
    };

    let started = no_countdown || countdown(&mut robot, countdown_s, &shutdown);
    let result = started.then(|| runner::run(&mut robot, &shutdown, ticks));
    // Dropping the robot closes the telemetry channel and ends the printer.
    drop(robot);
    if let Some(p) = printer
        && p.join().is_err()
    {
        tracing::warn!("telemetry printer panicked");
    }
    let Some(result) = result else {
        tracing::info!("interrupted during countdown");
        return Ok(());
    };
    let summary = result?;

    if ctx.json {
        println!(
            "{}",
            json!({
                "type": "summary",
                "ticks": summary.ticks,
                "elapsed_ms": summary.elapsed_ms,
                "final_state": summary.final_state.label(),
                "transitions": summary.transitions,
                "interrupted": summary.interrupted,
            })
        );
    } else {
        println!(
            "round finished: ticks={} elapsed_ms={} final_state={} transitions={}{}",
            summary.ticks,
            summary.elapsed_ms,
            summary.final_state,
            summary.transitions,
            if summary.interrupted { " (interrupted)" } else { "" }
        );
    }
    Ok(())
}

pub fn sensors(ctx: &Ctx<'_>, samples: u32, shutdown: &AtomicBool) -> eyre::Result<()> {
    let settings = ctx.settings()?;
    let period = tick_period(settings.timing.tick_hz);
    let mut robot = ctx.robot(settings)?;
    let clock = robot.clock().clone();

    for i in 0..samples {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let s = robot.read_ranges();
        let code = robot.read_edges().code();
        if ctx.json {
            println!(
                "{}",
                json!({
                    "type": "sensors",
                    "sample": i,
                    "left_cm": s.left_cm,
                    "right_cm": s.right_cm,
                    "line_code": code,
                    "line_label": line_label(code),
                })
            );
        } else {
            println!(
                "L={:>4} R={:>4} line={}",
                s.left_cm,
                s.right_cm,
                line_label(code)
            );
        }
        clock.sleep(period);
    }
    Ok(())
}

pub fn motors(
    ctx: &Ctx<'_>,
    direction: Direction,
    ticks: u64,
    shutdown: &AtomicBool,
) -> eyre::Result<()> {
    let settings = ctx.settings()?;
    let intent = MotorIntent::new(direction, &settings.drive);
    let period = tick_period(settings.timing.tick_hz);
    let mut robot = ctx.robot(settings)?;
    let clock = robot.clock().clone();

    robot.begin();
    tracing::info!(direction = direction.label(), ticks, "motor demo start");
    let mut last = [0u64; 2];
    let mut drive = || -> eyre::Result<()> {
        for _ in 0..ticks {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            if let Some(duty) = robot.drive_fixed(intent)? {
                let counts = Wheel::ALL.map(|w| robot.encoders().read_count(w));
                let delta = [
                    counts[0].saturating_sub(last[0]),
                    counts[1].saturating_sub(last[1]),
                ];
                last = counts;
                if ctx.json {
                    println!(
                        "{}",
                        json!({
                            "type": "motors",
                            "elapsed_ms": robot.elapsed_ms(),
                            "direction": direction.label(),
                            "duty": duty,
                            "counts": counts,
                            "delta": delta,
                        })
                    );
                } else {
                    println!(
                        "{:>6} ms {} duty={}/{} ticks={}/{} (+{}/+{})",
                        robot.elapsed_ms(),
                        direction.label(),
                        duty[0],
                        duty[1],
                        counts[0],
                        counts[1],
                        delta[0],
                        delta[1]
                    );
                }
            }
            clock.sleep(period);
        }
        Ok(())
    };
    let result = drive();
    if let Err(e) = robot.stop() {
        tracing::warn!(error = %e, "stop failed after motor demo");
    }
    result
}

fn print_table(ctx: &Ctx<'_>, t: &LineThresholds) {
    if ctx.json {
        let rows: Vec<_> = t
            .labeled()
            .map(|(label, bound)| json!({ "label": label, "below": bound }))
            .collect();
        println!("{}", json!({ "type": "line_table", "thresholds": rows }));
    } else {
        for (label, bound) in t.labeled() {
            println!("{label:<14} < {bound}");
        }
    }
}

pub fn line_table(ctx: &Ctx<'_>) -> eyre::Result<()> {
    let t = backend::resolve_thresholds(ctx.cfg, ctx.config_path)?;
    print_table(ctx, &t);
    Ok(())
}

pub fn line_reset(ctx: &Ctx<'_>) -> eyre::Result<()> {
    let mut store = backend::open_store(ctx.cfg, ctx.config_path)?;
    let t = LineThresholds::reset_to_defaults(&mut store)?;
    if !ctx.json {
        println!("line thresholds reset to defaults in {}", store.path().display());
    }
    print_table(ctx, &t);
    Ok(())
}

pub fn line_calibrate(ctx: &Ctx<'_>, levels: &[i32]) -> eyre::Result<()> {
    let levels: [i32; sumo_core::line::CODE_COUNT] = levels.try_into().map_err(|_| {
        eyre::eyre!(
            "line-calibrate needs {} levels, got {}",
            sumo_core::line::CODE_COUNT,
            levels.len()
        )
    })?;
    let computed = LineThresholds::from_recorded_levels(&levels);
    let t = LineThresholds::from_slice(computed.table())
        .wrap_err("recorded levels do not give an ascending table")?;
    let mut store = backend::open_store(ctx.cfg, ctx.config_path)?;
    t.save(&mut store)?;
    tracing::info!(path = %store.path().display(), "line thresholds calibrated");
    if !ctx.json {
        println!("line thresholds saved to {}", store.path().display());
    }
    print_table(ctx, &t);
    Ok(())
}

pub fn self_check(ctx: &Ctx<'_>) -> eyre::Result<()> {
    let settings = ctx.settings()?;
    let mut robot = ctx.robot(settings)?;
    let s = robot.read_ranges();
    let code = robot.read_edges().code();
    robot.stop().wrap_err("stopping wheels")?;
    if ctx.json {
        println!(
            "{}",
            json!({
                "type": "self_check",
                "ok": true,
                "left_cm": s.left_cm,
                "right_cm": s.right_cm,
                "line_code": code,
            })
        );
    } else {
        println!(
            "self-check ok: L={} R={} line={}",
            s.left_cm,
            s.right_cm,
            line_label(code)
        );
    }
    Ok(())
}
