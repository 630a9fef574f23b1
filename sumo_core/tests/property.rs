use proptest::prelude::*;
use sumo_core::{
    BaselineMode, BehaviorCfg, BehaviorMachine, DetectionHysteresis, DistanceRing, DriveCfg, EdgeFlags,
    FusionCfg, RangeSample, SensorFusion, pi_output,
};

prop_compose! {
    // Mostly in-range readings with the occasional dropout.
    fn reading()(cm in 1i32..400, dropout in 0u8..10) -> i32 {
        if dropout == 0 { sumo_traits::OUT_OF_RANGE } else { cm }
    }
}

prop_compose! {
    fn trace()(len in 1usize..300)(
        pairs in prop::collection::vec((reading(), reading(), 0u8..16), len)
    ) -> Vec<(i32, i32, u8)> {
        pairs
    }
}

fn fusion_cfg() -> FusionCfg {
    FusionCfg {
        buffer_size: 6,
        warmup_ms: 60,
        settle_wraps: 1,
        baseline: BaselineMode::Fixed(500),
        ..FusionCfg::default()
    }
}

proptest! {
    #[test]
    fn ring_mean_matches_window_average(fill in -500i32..500, cap in 1usize..16, values in prop::collection::vec(-1000i32..1000, 0..64)) {
        let mut ring = DistanceRing::new(cap, fill);
        let mut window = vec![fill; cap];
        for (i, v) in values.iter().enumerate() {
            ring.push(*v);
            window[i % cap] = *v;
        }
        let sum: i64 = window.iter().map(|&v| i64::from(v)).sum();
        prop_assert_eq!(i64::from(ring.mean()), sum / cap as i64);
        prop_assert_eq!(ring.filled(), values.len() >= cap);
    }

    #[test]
    fn hysteresis_counters_stay_in_bounds(hits in prop::collection::vec(any::<bool>(), 0..200), detect in 1u8..10, lost in 1u8..10) {
        let mut h = DetectionHysteresis::new(detect, lost);
        h.set_tracking(true);
        for hit in hits {
            let (d0, l0) = (h.detect().value(), h.lost_counter().value());
            h.observe(hit);
            let (d1, l1) = (h.detect().value(), h.lost_counter().value());
            prop_assert!(d1 <= detect);
            prop_assert!(l1 <= lost);

            let step = |before: u8, up: bool, cap: u8| match (up, before) {
                (true, b) if b < cap => b + 1,
                (false, b) if b > 0 => b - 1,
                (_, b) => b,
            };
            prop_assert_eq!(d1, step(d0, hit, detect));
            prop_assert_eq!(l1, step(l0, !hit, lost));
        }
    }

    #[test]
    fn pi_output_is_always_a_valid_duty(prev in any::<u8>(), prev_err in -1e4f32..1e4, err in -1e4f32..1e4, kp in 0f32..50.0, ki in 0f32..50.0) {
        let out = pi_output(prev, prev_err, err, kp, ki);
        let raw = f32::from(prev) + kp * (err - prev_err) + ki * (err + prev_err) / 2.0;
        if raw >= 255.0 {
            prop_assert_eq!(out, 255);
        } else if raw <= 0.0 {
            prop_assert_eq!(out, 0);
        } else {
            prop_assert!((f32::from(out) - raw).abs() <= 0.5);
        }
    }

    #[test]
    fn identical_inputs_produce_identical_commands(t in trace()) {
        let run = || {
            let mut f = SensorFusion::new(fusion_cfg());
            let mut m = BehaviorMachine::new(BehaviorCfg::default(), DriveCfg::default());
            let mut out = Vec::with_capacity(t.len());
            for (i, &(l, r, code)) in t.iter().enumerate() {
                let now = i as u64 * 20;
                let report = f.update(RangeSample::new(l, r), EdgeFlags::from_code(code), now);
                out.push((m.step(&report, f.hysteresis_mut(), now), m.state()));
            }
            out
        };
        prop_assert_eq!(run(), run());
    }

    #[test]
    fn nothing_is_detected_before_the_guard_lifts(t in trace()) {
        let mut f = SensorFusion::new(fusion_cfg());
        for (i, &(l, r, _)) in t.iter().enumerate() {
            let report = f.update(RangeSample::new(l, r), EdgeFlags::default(), i as u64 * 20);
            if !report.armed {
                prop_assert!(!report.opponent_present);
                prop_assert_eq!(f.hysteresis().detect().value(), 0);
            }
        }
    }
}
