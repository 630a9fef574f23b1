use rstest::rstest;
use sumo_config::{Rotation, load_file, load_toml, validate_thresholds};

const PINS: &str = r#"
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
"#;

fn with_pins(extra: &str) -> String {
    format!("{PINS}\n{extra}")
}

#[test]
fn pins_alone_give_a_valid_config_with_defaults() {
    let cfg = load_toml(PINS).expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.fusion.buffer_size, 8);
    assert_eq!(cfg.fusion.detect_required, 6);
    assert_eq!(cfg.behavior.ambiguous_rotation, Rotation::Ccw);
    assert_eq!(cfg.timing.tick_hz, 50);
    assert_eq!(cfg.pins.line_adc_channel, 0);
    assert!(cfg.line.thresholds.is_none());
}

#[test]
fn missing_pins_section_is_a_parse_error() {
    assert!(load_toml("[fusion]\nbuffer_size = 8\n").is_err());
}

#[test]
fn unknown_rotation_is_a_parse_error() {
    let toml = with_pins("[behavior]\nsearch_rotation = \"sideways\"\n");
    assert!(load_toml(&toml).is_err());
}

#[test]
fn shipped_sample_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../etc/sumo_config.toml");
    let cfg = load_file(&path).expect("sample config parses");
    cfg.validate().expect("sample config validates");
    assert_eq!(cfg.behavior.startup_rotation, Rotation::Cw);
    assert_eq!(cfg.line.store.as_deref(), Some("line_thresholds.csv"));
}

#[rstest]
#[case("[fusion]\nbuffer_size = 1", "fusion.buffer_size")]
#[case("[fusion]\ndetect_required = 0", "fusion.detect_required must be >= 1")]
#[case("[fusion]\nlost_required = 0", "fusion.lost_required must be >= 1")]
#[case("[fusion]\nsettle_wraps = 0", "fusion.settle_wraps must be >= 1")]
#[case("[fusion.baseline]\nfixed_cm = 0", "fusion.baseline.fixed_cm must be > 0")]
#[case("[behavior]\nedge_backoff_ms = 0", "behavior.edge_backoff_ms must be >= 1")]
#[case("[drive]\ncruise_fraction = 1.5", "drive.cruise_fraction")]
#[case("[pi]\nkp = -1.0", "pi.kp must be >= 0")]
#[case("[pi]\nupdate_interval_ms = 0", "pi.update_interval_ms must be >= 1")]
#[case("[timing]\ntick_hz = 0", "timing.tick_hz must be > 0")]
#[case("[line]\nthresholds = [1, 2, 3]", "16 entries")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation must be never, daily or hourly")]
fn rejects_bad_values(#[case] section: &str, #[case] needle: &str) {
    let cfg = load_toml(&with_pins(section)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn measured_baseline_ignores_fixed_value() {
    let toml = with_pins("[fusion.baseline]\nmeasured_samples = 10\nfixed_cm = 0\n");
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("fixed_cm unused when measuring");
}

#[rstest]
#[case::descending(vec![200, 100, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500, 1600])]
#[case::duplicate(vec![100, 100, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500, 1600])]
#[case::above_full_scale(vec![100, 200, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500, 5000])]
#[case::zero_start(vec![0, 200, 300, 400, 500, 600, 700, 800, 900, 1000, 1100, 1200, 1300, 1400, 1500, 1600])]
fn threshold_tables_are_checked(#[case] table: Vec<i32>) {
    assert!(validate_thresholds(&table).is_err());
}

#[test]
fn default_ladder_is_accepted() {
    let t = [
        1384, 1523, 1672, 1821, 1960, 2068, 2148, 2336, 2559, 2708, 2863, 3023, 3191, 3382, 3597,
        4096,
    ];
    validate_thresholds(&t).expect("default ladder is valid");
}
