use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
left_trigger = 23
left_echo = 24
right_trigger = 17
right_echo = 27
in1a = 5
in2a = 6
pwm_a = 12
in1b = 20
in2b = 21
pwm_b = 13
encoder_a = 16
encoder_b = 26

[timing]
status_every_ms = 100
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON: {l} ({e})")))
        .collect()
}

/// A round in JSON mode emits frames followed by one summary.
#[rstest]
fn jsonl_round_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("sumo")
        .unwrap()
        .env("SUMO_SIM_FAST", "1")
        .env("SUMO_SIM_RANGE", "-1,-1")
        .arg("--json")
        .arg("--log-level")
        .arg("warn")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--ticks", "50", "--no-countdown"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let lines = json_lines(&out.stdout);
    let (summary, frames) = lines.split_last().expect("at least a summary line");

    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["ticks"], 50);
    assert_eq!(summary["interrupted"], false);
    assert!(summary["elapsed_ms"].as_u64().is_some());
    assert!(summary["final_state"].is_string());

    // 50 ticks at 50 Hz is one second; status frames are 100 ms apart
    assert!(frames.len() >= 9, "expected ~10 frames, got {}", frames.len());
    for f in frames {
        assert_eq!(f["type"], "frame");
        for key in ["elapsed_ms", "left_cm", "right_cm", "buffer_mean", "edge_code"] {
            assert!(f[key].is_number(), "frame missing {key}: {f}");
        }
        assert!(f["armed"].is_boolean());
        assert_eq!(f["detect"].as_array().map(Vec::len), Some(2));
        assert_eq!(f["duty"].as_array().map(Vec::len), Some(2));
    }
    assert_eq!(frames[0]["state"], "SEARCHING");
}

/// Failures in JSON mode print one structured error on stdout.
#[rstest]
#[case(&["run", "--ticks", "10", "--no-countdown"], "Hardware", 3)]
#[case(&["line-reset"], "InvalidConfig", 2)]
fn jsonl_error_schema(#[case] args: &[&str], #[case] reason: &str, #[case] code: i32) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("sumo")
        .unwrap()
        .env("SUMO_SIM_FAST", "1")
        .env("SUMO_SIM_FAULT", "motors")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(args)
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(code));

    let lines = json_lines(&out.stdout);
    let err = lines.last().expect("error line");
    assert_eq!(err["reason"], reason);
    assert_eq!(err["exit_code"], code);
    assert!(err["message"].as_str().is_some_and(|m| m.starts_with("What happened")));
}
