//! Drivers for the sumo robot's sensors and drive train.
//!
//! The simulated collaborators in [`sim`] are always available; the rppal
//! drivers in `hardware` need the `hardware` feature on Linux.

pub mod encoder;
pub mod error;
pub mod sim;
pub mod ultrasonic;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware;

pub use encoder::EncoderCounters;
pub use error::HwError;
pub use sim::{SimulatedDrive, SimulatedLine, SimulatedPlant, SimulatedRange};
