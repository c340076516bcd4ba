use plume_core::domain::TargetHeights;
use plume_core::modules::detrainment::{
    compute_detrainment_profile, level_budgets, plume_top_height, truncate_at_plume_top,
};
use plume_core::modules::trace::{PlumeLevel, PlumeTrace, parse_trace_source};

/// Rising plume that decelerates through 1 m/s around `top_km` and keeps thinning above it.
fn synthetic_trace(level_count: usize, top_km: f64) -> PlumeTrace {
    spaced_trace(level_count, 0.1, top_km)
}

fn spaced_trace(level_count: usize, spacing_km: f64, top_km: f64) -> PlumeTrace {
    let levels = (0..level_count)
        .map(|index| {
            let height_km = index as f64 * spacing_km;
            let velocity = (12.0 * (1.0 - height_km / (top_km + 0.05))).max(0.05);
            let mut record = vec![0.0; 15];
            record[0] = height_km;
            record[1] = 870.0 - 95.0 * height_km;
            record[2] = velocity;
            record[11] = 0.25 + 0.04 * height_km;
            record[12] = -8.0e-4;
            record[13] = 306.0 - 6.5 * height_km;
            record[14] = 300.0 - 6.5 * height_km;
            PlumeLevel::from_record(record).expect("record is long enough")
        })
        .collect();
    PlumeTrace::new(levels)
}

fn assert_normalized(weights: &[f64]) {
    assert!(weights.iter().all(|weight| *weight >= 0.0), "negative weight in {:?}", weights);
    let total = weights.iter().sum::<f64>();
    assert!((total - 1.0).abs() < 1.0e-12, "weights sum to {}", total);
}

#[test]
fn native_profile_is_non_negative_and_sums_to_one() {
    for top_km in [0.35, 1.2, 2.75, 5.0] {
        let trace = synthetic_trace(80, top_km);
        let profile =
            compute_detrainment_profile(&trace, &TargetHeights::Native).expect("profile");
        assert_normalized(&profile.weights());
        assert!(
            profile
                .heights()
                .iter()
                .all(|height| *height <= profile.plume_top_height() + 100.0)
        );
    }
}

#[test]
fn custom_profile_on_native_grid_matches_native_profile() {
    let trace = synthetic_trace(60, 2.0);
    let native = compute_detrainment_profile(&trace, &TargetHeights::Native).expect("native");
    let targets = TargetHeights::custom(native.heights()).expect("native heights are valid");
    let custom = compute_detrainment_profile(&trace, &targets).expect("custom");

    assert_eq!(native.heights(), custom.heights());
    for (a, b) in native.weights().iter().zip(custom.weights()) {
        assert!((a - b).abs() < 1.0e-12);
    }
}

#[test]
fn custom_targets_beyond_the_plume_clamp_to_edge_values() {
    let trace = synthetic_trace(60, 1.0);
    let targets = TargetHeights::arange(50.0, 20000.0, 100.0).expect("range is valid");
    let profile = compute_detrainment_profile(&trace, &targets).expect("profile");

    assert_eq!(profile.levels().len(), 200);
    assert_normalized(&profile.weights());
    let weights = profile.weights();
    let tail = &weights[50..];
    assert!(tail.windows(2).all(|pair| pair[0] == pair[1]));
}

#[test]
fn budgets_convert_to_si_units() {
    let source = "\
1.000 900.0 5.0 0 0 0 0 0 0 0 0 0.200 -0.001 300.0 295.0
1.100 890.0 0.5 0 0 0 0 0 0 0 0 0.210 -0.001 299.0 294.0
";
    let trace = parse_trace_source(source).expect("trace parses");
    let budgets = level_budgets(&trace).expect("budgets");
    assert_eq!(budgets[0].height, 1000.0);
    assert_eq!(budgets[0].pressure, 90_000.0);
    assert_eq!(budgets[0].radius, 200.0);
    let expected_density = 90_000.0 / (300.0 * 287.0);
    assert!((budgets[0].density - expected_density).abs() < 1.0e-12);
    assert_eq!(budgets[0].inbound_flux, 0.0);
}

#[test]
fn last_retained_level_has_no_outbound_flux() {
    let trace = synthetic_trace(40, 1.5);
    let budgets = level_budgets(&trace).expect("budgets");
    let heights = budgets.iter().map(|budget| budget.height).collect::<Vec<_>>();
    let velocities = budgets
        .iter()
        .map(|budget| budget.vertical_velocity)
        .collect::<Vec<_>>();
    let top = plume_top_height(&heights, &velocities).expect("plume slows");
    let retained = truncate_at_plume_top(budgets, top);

    let last = retained.last().expect("levels retained");
    assert_eq!(last.outbound_flux, 0.0);
    assert!(last.height <= top + 100.0);
    assert!(retained[..retained.len() - 1].iter().all(|budget| budget.outbound_flux != 0.0));
}

#[test]
fn fluxes_follow_level_height_on_a_fine_grid() {
    let budgets = level_budgets(&spaced_trace(20, 0.05, 0.6)).expect("budgets");
    let at = |height: f64| {
        budgets
            .iter()
            .find(|budget| (budget.height - height).abs() < 1.0e-6)
            .copied()
            .expect("level exists")
    };

    // 150 m sits between the 100 m and 200 m interfaces.
    assert_eq!(at(150.0).inbound_flux, at(100.0).outbound_flux);
    assert_eq!(at(150.0).outbound_flux, at(200.0).outbound_flux);
    assert_eq!(at(250.0).inbound_flux, at(200.0).outbound_flux);
    assert_eq!(at(50.0).inbound_flux, at(100.0).inbound_flux);
    assert_eq!(at(0.0).inbound_flux, 0.0);
    assert!(at(250.0).inbound_flux > 0.0);

    let profile = compute_detrainment_profile(&spaced_trace(20, 0.05, 0.6), &TargetHeights::Native)
        .expect("profile");
    assert_normalized(&profile.weights());
}

#[test]
fn single_level_trace_is_rejected() {
    let trace = synthetic_trace(1, 1.0);
    let error = compute_detrainment_profile(&trace, &TargetHeights::Native)
        .expect_err("one level cannot be interpolated");
    assert_eq!(error.placeholder(), "INPUT.TRACE_TOO_SHORT");
}
