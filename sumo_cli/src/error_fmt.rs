//! Human-readable error descriptions and structured JSON error formatting.

use sumo_core::error::{BuildError, SumoError};

fn typed<'a, T: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = typed::<BuildError>(err) {
        return match be {
            BuildError::MissingRange => {
                "What happened: No range sensor was provided to the robot.\nLikely causes: The ultrasonic pair failed to initialize or was not wired into the builder.\nHow to fix: Check the trigger/echo pins in [pins] and that the sensors are powered.".to_string()
            }
            BuildError::MissingMotors => {
                "What happened: No motor driver was provided to the robot.\nLikely causes: The H-bridge pins failed to initialize or were not wired into the builder.\nHow to fix: Check the in1/in2/pwm pins in [pins].".to_string()
            }
            BuildError::MissingEncoders => {
                "What happened: No wheel encoders were provided to the robot.\nLikely causes: Encoder interrupts could not be registered.\nHow to fix: Check encoder_a/encoder_b in [pins] and GPIO permissions.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/sumo_config.toml for a sample."
            ),
        };
    }

    if let Some(se) = typed::<SumoError>(err) {
        return match se {
            SumoError::Timeout => "What happened: A sensor did not answer in time.\nLikely causes: Ultrasonic echo pin not wired, sensor unpowered, or timing.echo_timeout_us too low.\nHow to fix: Verify trigger/echo wiring and power, and consider raising timing.echo_timeout_us.".to_string(),
            SumoError::Hardware(msg) | SumoError::HardwareFault(msg) => format!(
                "What happened: The drive train reported an error ({msg}).\nLikely causes: H-bridge unpowered, wrong pins, or insufficient GPIO permissions.\nHow to fix: Check motor power and the [pins] section; the wheels were told to stop."
            ),
            SumoError::Store(msg) => format!(
                "What happened: The line threshold store could not be written ({msg}).\nLikely causes: Read-only filesystem or a bad line.store path.\nHow to fix: Point line.store at a writable CSV file."
            ),
            SumoError::Config(msg) => format!(
                "What happened: {msg}.\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains(" must be") || lower.contains(" must have") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Missing [pins] keys or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("settings csv must have headers") {
        return "Invalid headers in line threshold store. Expected 'key,value'.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family; anything unrecognized returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if typed::<BuildError>(err).is_some() {
        return 2;
    }
    match typed::<SumoError>(err) {
        Some(SumoError::Config(_)) => 2,
        Some(SumoError::Hardware(_) | SumoError::HardwareFault(_)) => 3,
        Some(SumoError::Timeout) => 4,
        Some(SumoError::Store(_)) => 5,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = typed::<BuildError>(err) {
        return match be {
            BuildError::MissingRange | BuildError::MissingMotors | BuildError::MissingEncoders => {
                "MissingCollaborator"
            }
            BuildError::InvalidConfig(_) => "InvalidConfig",
        };
    }
    match typed::<SumoError>(err) {
        Some(SumoError::Config(_)) => "InvalidConfig",
        Some(SumoError::Hardware(_) | SumoError::HardwareFault(_)) => "Hardware",
        Some(SumoError::Timeout) => "Timeout",
        Some(SumoError::Store(_)) => "Store",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
