//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sumo", version, about = "Sumo robot behavior CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/sumo_config.toml")]
    pub config: PathBuf,

    /// Emit JSON lines on stdout instead of human-readable text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a competition round until Ctrl-C (or --ticks control ticks)
    Run {
        /// Stop after this many control ticks
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Skip the start countdown
        #[arg(long, action = ArgAction::SetTrue)]
        no_countdown: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux.\n\nAttempts SCHED_FIFO priority and locks the process address space into RAM with mlockall. This reduces jitter in the control tick but may require CAP_SYS_NICE / CAP_IPC_LOCK or root. Failures are logged and the round runs anyway."
        )]
        rt: bool,
        /// SCHED_FIFO priority when --rt is set (defaults to the system maximum)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt
        #[arg(long, value_enum, value_name = "MODE", default_value = "current")]
        rt_lock: RtLock,
    },
    /// Print range pairs and the decoded line code
    Sensors {
        /// Number of readings to take
        #[arg(long, value_name = "N", default_value_t = 10)]
        samples: u32,
    },
    /// Hold one drive direction under PI control and report duty/encoders
    Motors {
        /// forward | reverse | left | right | cw | ccw
        #[arg(long, value_name = "DIR")]
        direction: sumo_core::Direction,
        /// Number of control ticks to drive for
        #[arg(long, value_name = "N", default_value_t = 100)]
        ticks: u64,
    },
    /// Print the active line-sensor threshold table
    LineTable,
    /// Overwrite the stored threshold table with the defaults
    LineReset,
    /// Compute thresholds from 16 recorded ADC levels and store them
    LineCalibrate {
        /// 16 comma-separated ADC levels, one per line code in code order
        #[arg(long, value_name = "L0,L1,...", value_delimiter = ',', required = true)]
        levels: Vec<i32>,
    },
    /// Quick health check (build collaborators, take one reading)
    SelfCheck,
}
