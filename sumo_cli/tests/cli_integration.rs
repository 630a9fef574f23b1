use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

const PINS: &str = r#"
[pins]
# pins are unused in sim backend but must be present
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
"#;

fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, format!("{PINS}\n{extra}")).unwrap();
    path
}

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    write_config(dir, "")
}

fn sumo(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("sumo").unwrap();
    cmd.arg("--config").arg(cfg).env("SUMO_SIM_FAST", "1");
    cmd.env_remove("SUMO_SIM_RANGE")
        .env_remove("SUMO_SIM_LINE")
        .env_remove("SUMO_SIM_FAULT")
        .env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--ticks", "20", "--no-countdown"], 0, "round finished: ticks=20", "stdout")]
#[case(&["run", "--ticks", "5"], 0, "Starting in 1...", "stdout")]
#[case(&[], 2, "Usage:", "stderr")]
#[case(&["motors"], 2, "--direction", "stderr")]
#[case(&["motors", "--direction", "sideways"], 2, "unknown direction", "stderr")]
#[case(&["line-table"], 0, "0000 NO_LINE", "stdout")]
#[case(&["self-check"], 0, "self-check ok", "stdout")]
#[case(&["line-calibrate", "--levels", "1,2,3"], 1, "needs 16 levels", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = sumo(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[fusion]\nbuffer_size = 1\n", "fusion.buffer_size must be in [2, 64]")]
#[case("[timing]\ntick_hz = 0\n", "invalid configuration")]
#[case("[logging]\nrotation = \"weekly\"\n", "What happened")]
fn invalid_config_exits_with_config_code(#[case] extra: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, extra);

    sumo(&cfg)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("nope.toml");

    sumo(&cfg)
        .arg("line-table")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nope.toml"));
}

#[test]
fn motor_fault_aborts_round_with_hardware_code() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    sumo(&cfg)
        .env("SUMO_SIM_FAULT", "motors")
        .args(["run", "--ticks", "10", "--no-countdown"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("drive train"));
}

#[test]
fn sensors_print_scripted_ranges() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    sumo(&cfg)
        .env("SUMO_SIM_RANGE", "40,60")
        .args(["sensors", "--samples", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("L=  40 R=  60 line=0000 NO_LINE"));
}

#[test]
fn sensors_report_line_code_from_adc_level() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    // 3000 decodes to 1011 with the default ladder
    sumo(&cfg)
        .env("SUMO_SIM_LINE", "3000")
        .args(["sensors", "--samples", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("line=1011 R_LEFT_2"));
}

#[test]
fn motors_report_duty_and_encoder_counts() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    sumo(&cfg)
        .args(["motors", "--direction", "forward", "--ticks", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FORWARD duty="));
}

#[test]
fn line_store_commands_need_a_store() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    sumo(&cfg)
        .arg("line-reset")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("line.store is not set"));
}

#[test]
fn calibrated_thresholds_persist_in_the_store() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[line]\nstore = \"line.csv\"\n");
    let store = dir.path().join("line.csv");

    sumo(&cfg)
        .arg("line-reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("reset to defaults"))
        .stdout(predicate::str::contains("< 1384"));
    assert!(store.exists());

    let levels = "1300,1450,1600,1750,1900,2000,2100,2250,2450,2600,2800,2950,3100,3300,3500,3800";
    sumo(&cfg)
        .args(["line-calibrate", "--levels", levels])
        .assert()
        .success()
        .stdout(predicate::str::contains("saved to"));

    // codes 6 and 9 are interpolated; the last bound sits halfway to full scale
    sumo(&cfg)
        .arg("line-table")
        .assert()
        .success()
        .stdout(predicate::str::contains("0000 NO_LINE   < 1375"))
        .stdout(predicate::str::contains("0110 INVALID1  < 2187"))
        .stdout(predicate::str::contains("1111 OUTSIDE   < 3948"));

    let csv = fs::read_to_string(&store).unwrap();
    assert!(csv.starts_with("key,value"));
    assert!(csv.contains("1111 OUTSIDE,3948"));
}

#[test]
fn descending_calibration_is_rejected_and_store_untouched() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "[line]\nstore = \"line.csv\"\n");
    let store = dir.path().join("line.csv");

    let levels = "3800,3500,3300,3100,2950,2800,2600,2450,2250,2100,2000,1900,1750,1600,1450,1300";
    sumo(&cfg)
        .args(["line-calibrate", "--levels", levels])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ascending"));
    assert!(!store.exists());
}
