//! Full rounds against the simulated plant on a manual clock.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use sumo_core::{
    BaselineMode, FusionCfg, Robot, RobotState, SumoError, Timing, countdown, run, telemetry,
};
use sumo_hardware::{SimulatedDrive, SimulatedLine, SimulatedPlant, SimulatedRange};
use sumo_traits::{Clock, DriveMode, DriveMotors, ManualClock, OUT_OF_RANGE, StatusSink, Wheel};

#[derive(Clone, Default)]
struct Lines(Arc<Mutex<Vec<String>>>);

impl StatusSink for Lines {
    fn publish(&mut self, text: &str) {
        self.0.lock().unwrap().push(text.to_string());
    }
}

fn fusion() -> FusionCfg {
    FusionCfg {
        buffer_size: 8,
        warmup_ms: 100,
        settle_wraps: 1,
        baseline: BaselineMode::Fixed(1000),
        ..FusionCfg::default()
    }
}

/// 30 ticks of empty arena, then an opponent 40 cm straight ahead.
fn approaching_opponent() -> SimulatedRange {
    let mut script = vec![(OUT_OF_RANGE, OUT_OF_RANGE); 30];
    script.push((40, 40));
    SimulatedRange::scripted(script)
}

fn robot_with(
    range: SimulatedRange,
    line: SimulatedLine,
) -> (Robot, Arc<SimulatedPlant<ManualClock>>, ManualClock) {
    let clock = ManualClock::new();
    let plant = SimulatedPlant::new(clock.clone(), 0.05);
    let robot = Robot::builder()
        .with_range_sensor(range)
        .with_line_sensor(line)
        .with_motors(SimulatedDrive::new(plant.clone()))
        .with_encoders(plant.clone())
        .with_fusion(fusion())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("valid robot");
    (robot, plant, clock)
}

#[test]
fn round_finds_and_chases_opponent() {
    let (mut robot, plant, clock) = robot_with(approaching_opponent(), SimulatedLine::constant(0));
    let shutdown = AtomicBool::new(false);

    let summary = run(&mut robot, &shutdown, Some(40)).expect("round runs");

    assert_eq!(summary.ticks, 40);
    assert_eq!(summary.final_state, RobotState::Chasing);
    assert_eq!(summary.transitions, 1);
    assert!(!summary.interrupted);
    // 50 Hz pacing on the manual clock
    assert_eq!(clock.elapsed().as_millis(), 800);
    // wheels stopped on the way out
    for wheel in Wheel::ALL {
        assert_eq!(plant.mode(wheel), DriveMode::Brake);
        assert_eq!(plant.duty(wheel), 0);
    }
}

#[test]
fn search_spins_the_wheels_under_pi_control() {
    let (mut robot, plant, _clock) = robot_with(
        SimulatedRange::constant(OUT_OF_RANGE, OUT_OF_RANGE),
        SimulatedLine::constant(0),
    );
    robot.begin();
    let mut duties = Vec::new();
    for _ in 0..60 {
        let outcome = robot.tick().expect("tick");
        assert_eq!(outcome.state, RobotState::Searching);
        if let Some(d) = outcome.duty {
            duties.push(d);
        }
        robot.clock().sleep(std::time::Duration::from_millis(20));
    }
    // one PI update per 500 ms
    assert_eq!(duties.len(), 2);
    assert!(duties[0][0] > 0 && duties[0][1] > 0);
    // default search spin is counter-clockwise: left back, right forward
    assert_eq!(plant.mode(Wheel::Left), DriveMode::Reverse);
    assert_eq!(plant.mode(Wheel::Right), DriveMode::Forward);
}

#[test]
fn edge_on_the_line_triggers_avoid_edge() {
    // 3000 decodes to code 0b1011 with the default ladder: front-left plus
    // both rear corners
    let (mut robot, _plant, _clock) = robot_with(
        SimulatedRange::constant(OUT_OF_RANGE, OUT_OF_RANGE),
        SimulatedLine::scripted(vec![0, 0, 3000, 0]),
    );
    robot.begin();
    let states: Vec<RobotState> = (0..4)
        .map(|_| {
            let s = robot.tick().expect("tick").state;
            robot.clock().sleep(std::time::Duration::from_millis(20));
            s
        })
        .collect();
    assert_eq!(
        states,
        [
            RobotState::Searching,
            RobotState::Searching,
            RobotState::AvoidEdge,
            RobotState::AvoidEdge
        ]
    );
    assert_eq!(robot.behavior().recorded_edge().code(), 0b1011);
}

#[test]
fn edge_escape_drives_at_the_kept_pi_output() {
    // ticks at 0, 20, .., 500 ms read no line; 3100 at 520 ms is code 0b1100
    let mut line = vec![0; 26];
    line.extend([3100, 0]);
    let (mut robot, plant, _clock) = robot_with(
        SimulatedRange::constant(OUT_OF_RANGE, OUT_OF_RANGE),
        SimulatedLine::scripted(line),
    );
    robot.begin();

    let mut searched = None;
    for _ in 0..26 {
        let outcome = robot.tick().expect("tick");
        if let Some(d) = outcome.duty {
            searched = Some(d);
        }
        robot.clock().sleep(std::time::Duration::from_millis(20));
    }
    let searched = searched.expect("PI update at 500 ms");
    assert!(searched[0] > 0 && searched[1] > 0);

    let entry = robot.tick().expect("tick");
    assert_eq!(entry.state, RobotState::AvoidEdge);
    assert_eq!(plant.duty(Wheel::Left), 0);
    robot.clock().sleep(std::time::Duration::from_millis(20));

    // 540..800 ms: backing off inside the 300 ms window
    for _ in 0..14 {
        let outcome = robot.tick().expect("tick");
        assert_eq!(outcome.state, RobotState::AvoidEdge);
        for wheel in Wheel::ALL {
            assert_eq!(plant.mode(wheel), DriveMode::Reverse);
            assert_eq!(plant.duty(wheel), searched[wheel.index()]);
        }
        assert_eq!(robot.duty(), searched);
        robot.clock().sleep(std::time::Duration::from_millis(20));
    }
}

#[test]
fn raised_shutdown_ends_round_before_first_tick() {
    let (mut robot, _plant, _clock) = robot_with(approaching_opponent(), SimulatedLine::constant(0));
    let shutdown = AtomicBool::new(true);
    let summary = run(&mut robot, &shutdown, None).expect("round runs");
    assert!(summary.interrupted);
    assert_eq!(summary.ticks, 0);
    assert!(!countdown(&mut robot, 3, &shutdown));
}

#[test]
fn status_is_throttled_and_telemetry_never_blocks() {
    let clock = ManualClock::new();
    let plant = SimulatedPlant::new(clock.clone(), 0.05);
    let lines = Lines::default();
    let (feed, rx) = telemetry::channel(2);
    let mut robot = Robot::builder()
        .with_range_sensor(SimulatedRange::constant(60, 60))
        .with_motors(SimulatedDrive::new(plant.clone()))
        .with_encoders(plant)
        .with_fusion(fusion())
        .with_timing(Timing {
            status_every_ms: 100,
            ..Timing::default()
        })
        .with_status_sink(lines.clone())
        .with_telemetry(feed.clone())
        .with_clock(Box::new(clock))
        .build()
        .expect("valid robot");

    let shutdown = AtomicBool::new(false);
    run(&mut robot, &shutdown, Some(10)).expect("round runs");

    // ticks at 0, 20, .., 180 ms: frames at 0 and 100
    let published = lines.0.lock().unwrap().clone();
    assert_eq!(published.len(), 2);
    assert!(published[0].starts_with("SEARCHING"));
    assert_eq!(rx.len(), 2);
    assert_eq!(feed.dropped(), 0);
}

#[derive(Debug)]
struct StuckMotors;

impl DriveMotors for StuckMotors {
    fn set_direction(
        &mut self,
        _wheel: Wheel,
        _mode: DriveMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("h-bridge not responding".into())
    }
    fn set_duty(
        &mut self,
        _wheel: Wheel,
        _duty: u8,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[test]
fn actuator_failure_aborts_the_round() {
    let clock = ManualClock::new();
    let mut robot = Robot::builder()
        .with_range_sensor(SimulatedRange::constant(60, 60))
        .with_motors(StuckMotors)
        .with_encoders(sumo_hardware::EncoderCounters::new())
        .with_clock(Box::new(clock))
        .build()
        .expect("valid robot");

    let shutdown = AtomicBool::new(false);
    let err = run(&mut robot, &shutdown, Some(5)).expect_err("motors fail");
    assert!(format!("{err:#}").contains("control tick failed"));
    let root = err.chain().find_map(|e| e.downcast_ref::<SumoError>());
    assert!(matches!(root, Some(SumoError::Hardware(_))));
}
