//! Behavioral state machine.
//!
//! One call to [`BehaviorMachine::step`] per control tick. The only inputs are
//! the fused report, the shared hysteresis counters and the tick time, so two
//! machines fed the same sequence produce the same commands.

use crate::config::{BehaviorCfg, DriveCfg};
use crate::fusion::FusedReport;
use crate::hysteresis::DetectionHysteresis;
use crate::types::{Command, Direction, EdgeFlags, MotorIntent, OpponentSide, Rotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotState {
    StartupRotate,
    Searching,
    Chasing,
    AvoidEdge,
}

impl RobotState {
    pub fn label(self) -> &'static str {
        match self {
            RobotState::StartupRotate => "STARTUP_ROTATE",
            RobotState::Searching => "SEARCHING",
            RobotState::Chasing => "CHASING",
            RobotState::AvoidEdge => "AVOID_EDGE",
        }
    }
}

impl std::fmt::Display for RobotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Way out of an edge: reverse off a front edge, drive forward off a rear
/// edge. With front and rear both on the line, spin toward the clear side if
/// there is one, else use `ambiguous`.
pub fn escape_direction(edge: EdgeFlags, ambiguous: Rotation) -> Direction {
    match (edge.front(), edge.rear()) {
        (true, true) => match (edge.left(), edge.right()) {
            (true, false) => Direction::RotateCw,
            (false, true) => Direction::RotateCcw,
            _ => ambiguous.direction(),
        },
        (true, false) => Direction::Reverse,
        (false, true) => Direction::Forward,
        (false, false) => ambiguous.direction(),
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorMachine {
    cfg: BehaviorCfg,
    drive: DriveCfg,
    state: RobotState,
    last_side: OpponentSide,
    edge: EdgeFlags,
    edge_since_ms: u64,
}

impl BehaviorMachine {
    pub fn new(cfg: BehaviorCfg, drive: DriveCfg) -> Self {
        let state = Self::initial_state(&cfg);
        Self {
            cfg,
            drive,
            state,
            last_side: OpponentSide::None,
            edge: EdgeFlags::default(),
            edge_since_ms: 0,
        }
    }

    fn initial_state(cfg: &BehaviorCfg) -> RobotState {
        if cfg.startup_rotate {
            RobotState::StartupRotate
        } else {
            RobotState::Searching
        }
    }

    /// Return to the initial state.
    pub fn begin(&mut self) {
        self.state = Self::initial_state(&self.cfg);
        self.last_side = OpponentSide::None;
        self.edge = EdgeFlags::default();
        self.edge_since_ms = 0;
    }

    #[inline]
    pub fn state(&self) -> RobotState {
        self.state
    }

    /// Side the opponent was last seen on while chasing.
    #[inline]
    pub fn last_side(&self) -> OpponentSide {
        self.last_side
    }

    /// Edge flags captured on entry to `AvoidEdge`.
    #[inline]
    pub fn recorded_edge(&self) -> EdgeFlags {
        self.edge
    }

    fn drive(&self, direction: Direction) -> Command {
        Command::Drive(MotorIntent::new(direction, &self.drive))
    }

    fn steer(&self, side: OpponentSide) -> Command {
        self.drive(match side {
            OpponentSide::Left => Direction::Left,
            OpponentSide::Right => Direction::Right,
            OpponentSide::None => Direction::Forward,
        })
    }

    fn search(&self) -> Command {
        self.drive(match self.last_side {
            OpponentSide::Left => Direction::RotateCcw,
            OpponentSide::Right => Direction::RotateCw,
            OpponentSide::None => self.cfg.search_rotation.direction(),
        })
    }

    fn enter(&mut self, next: RobotState, now_ms: u64) {
        if next != self.state {
            tracing::debug!(from = %self.state, to = %next, now_ms, "state transition");
            self.state = next;
        }
    }

    fn enter_avoid_edge(&mut self, report: &FusedReport, counters: &mut DetectionHysteresis, now_ms: u64) -> Command {
        self.edge = report.edge;
        self.edge_since_ms = now_ms;
        counters.set_tracking(false);
        counters.clear();
        self.enter(RobotState::AvoidEdge, now_ms);
        Command::Stop
    }

    fn enter_chasing(&mut self, report: &FusedReport, counters: &mut DetectionHysteresis, now_ms: u64) -> Command {
        counters.clear_lost();
        counters.set_tracking(true);
        if report.opponent_side != OpponentSide::None {
            self.last_side = report.opponent_side;
        }
        self.enter(RobotState::Chasing, now_ms);
        self.steer(report.opponent_side)
    }

    /// Advance one tick.
    pub fn step(&mut self, report: &FusedReport, counters: &mut DetectionHysteresis, now_ms: u64) -> Command {
        match self.state {
            RobotState::StartupRotate => {
                if report.opponent_present {
                    counters.clear();
                    self.enter_chasing(report, counters, now_ms)
                } else {
                    self.drive(self.cfg.startup_rotation.direction())
                }
            }
            RobotState::Searching => {
                if report.edge_triggered() {
                    self.enter_avoid_edge(report, counters, now_ms)
                } else if report.opponent_present {
                    self.enter_chasing(report, counters, now_ms)
                } else {
                    self.search()
                }
            }
            RobotState::Chasing => {
                if report.edge_triggered() {
                    self.enter_avoid_edge(report, counters, now_ms)
                } else if report.both_out_of_range || report.opponent_lost {
                    counters.clear_detect();
                    counters.clear_lost();
                    counters.set_tracking(false);
                    self.enter(RobotState::Searching, now_ms);
                    self.search()
                } else {
                    if report.opponent_side != OpponentSide::None {
                        self.last_side = report.opponent_side;
                    }
                    self.steer(report.opponent_side)
                }
            }
            RobotState::AvoidEdge => {
                if now_ms.saturating_sub(self.edge_since_ms) > self.cfg.edge_backoff_ms {
                    counters.clear();
                    self.enter(RobotState::Searching, now_ms);
                    self.search()
                } else {
                    self.drive(escape_direction(self.edge, self.cfg.ambiguous_rotation))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0b1100, Direction::Reverse)]
    #[case(0b1000, Direction::Reverse)]
    #[case(0b0011, Direction::Forward)]
    #[case(0b0001, Direction::Forward)]
    #[case(0b1010, Direction::RotateCw)] // left side only
    #[case(0b0101, Direction::RotateCcw)] // right side only
    #[case(0b1001, Direction::RotateCcw)] // diagonal: ambiguous
    #[case(0b1111, Direction::RotateCcw)]
    fn escape_policy(#[case] code: u8, #[case] want: Direction) {
        assert_eq!(escape_direction(EdgeFlags::from_code(code), Rotation::Ccw), want);
    }

    #[test]
    fn startup_rotate_holds_until_present() {
        let cfg = BehaviorCfg {
            startup_rotate: true,
            ..BehaviorCfg::default()
        };
        let mut m = BehaviorMachine::new(cfg, DriveCfg::default());
        let mut h = DetectionHysteresis::new(1, 1);
        let idle = FusedReport::default();
        match m.step(&idle, &mut h, 0) {
            Command::Drive(i) => assert_eq!(i.direction, Direction::RotateCw),
            other => panic!("unexpected {other:?}"),
        }
        let seen = FusedReport {
            opponent_present: true,
            ..FusedReport::default()
        };
        m.step(&seen, &mut h, 20);
        assert_eq!(m.state(), RobotState::Chasing);
        assert!(h.tracking());
    }

    #[test]
    fn avoid_edge_backs_off_then_searches() {
        let mut m = BehaviorMachine::new(BehaviorCfg::default(), DriveCfg::default());
        let mut h = DetectionHysteresis::new(6, 8);
        let front = FusedReport {
            edge: EdgeFlags::from_code(0b1100),
            ..FusedReport::default()
        };
        assert_eq!(m.step(&front, &mut h, 1000), Command::Stop);
        assert_eq!(m.state(), RobotState::AvoidEdge);

        let clear = FusedReport::default();
        match m.step(&clear, &mut h, 1300) {
            Command::Drive(i) => assert_eq!(i.direction, Direction::Reverse),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(m.state(), RobotState::AvoidEdge);
        m.step(&clear, &mut h, 1301);
        assert_eq!(m.state(), RobotState::Searching);
    }

    #[test]
    fn search_turns_toward_last_seen_side() {
        let mut m = BehaviorMachine::new(BehaviorCfg::default(), DriveCfg::default());
        let mut h = DetectionHysteresis::new(1, 1);
        let right = FusedReport {
            opponent_present: true,
            opponent_side: OpponentSide::Right,
            ..FusedReport::default()
        };
        m.step(&right, &mut h, 0);
        let gone = FusedReport {
            both_out_of_range: true,
            ..FusedReport::default()
        };
        match m.step(&gone, &mut h, 20) {
            Command::Drive(i) => assert_eq!(i.direction, Direction::RotateCw),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(m.state(), RobotState::Searching);
    }
}
