//! Status frames for the display and for external observers.
//!
//! Frames go out through a bounded channel with `try_send`; when the reader
//! falls behind, frames are dropped and counted, and the control loop never
//! waits.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel as xch;

use crate::behavior::RobotState;
use crate::types::OpponentSide;

#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub elapsed_ms: u64,
    pub state: RobotState,
    pub left_cm: i32,
    pub right_cm: i32,
    /// Normalized average pushed this tick.
    pub avg_cm: i32,
    pub baseline_cm: Option<i32>,
    pub buffer_mean: i32,
    pub buffer_filled: bool,
    pub armed: bool,
    pub detect: (u8, u8),
    pub lost: (u8, u8),
    pub opponent_side: OpponentSide,
    pub edge_code: u8,
    pub duty: [u8; 2],
}

impl fmt::Display for TelemetryFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.opponent_side {
            OpponentSide::Left => "L",
            OpponentSide::Right => "R",
            OpponentSide::None => "-",
        };
        write!(
            f,
            "{:<14} L={:>4} R={:>4} avg={:>4} base={} mean={:>4} full={} armed={} det={}/{} lost={}/{} side={} edge={:04b} duty={}/{}",
            self.state.label(),
            self.left_cm,
            self.right_cm,
            self.avg_cm,
            self.baseline_cm.map_or_else(|| "--".to_string(), |b| b.to_string()),
            self.buffer_mean,
            if self.buffer_filled { "Y" } else { "N" },
            if self.armed { "Y" } else { "N" },
            self.detect.0,
            self.detect.1,
            self.lost.0,
            self.lost.1,
            side,
            self.edge_code,
            self.duty[0],
            self.duty[1],
        )
    }
}

/// Sending half of the telemetry channel.
#[derive(Debug, Clone)]
pub struct TelemetryFeed {
    tx: xch::Sender<TelemetryFrame>,
    dropped: Arc<AtomicU64>,
}

/// Create a feed holding at most `capacity` unread frames.
pub fn channel(capacity: usize) -> (TelemetryFeed, xch::Receiver<TelemetryFrame>) {
    let (tx, rx) = xch::bounded(capacity.max(1));
    (
        TelemetryFeed {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl TelemetryFeed {
    /// Offer a frame without blocking. Returns false if it was dropped.
    pub fn offer(&self, frame: TelemetryFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(xch::TrySendError::Disconnected(_)) => false,
        }
    }

    /// Frames dropped because the channel was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
