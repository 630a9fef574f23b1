#![no_main]
use libfuzzer_sys::fuzz_target;

// Arbitrary TOML either fails to parse or yields a config whose validation
// returns cleanly.
fuzz_target!(|data: &str| {
    if let Ok(cfg) = sumo_config::load_toml(data) {
        let _ = cfg.validate();
        if let Some(t) = &cfg.line.thresholds {
            let _ = sumo_config::validate_thresholds(t);
        }
    }
});
