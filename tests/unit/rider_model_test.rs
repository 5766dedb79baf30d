//! Unit tests for the rider model: PDC lookups, duration caps, W′
//! accounting, and drivetrain efficiency.

use coursecast::rider::{
    drivetrain, Drivetrain, PowerDurationCurve, RiderProfile, WPrimeBalance,
};

fn profile() -> RiderProfile {
    RiderProfile {
        mass_kg: 70.0,
        cp_w: 281.0,
        w_prime_j: 19000.0,
        pdc: PowerDurationCurve::from_points([
            (60.0, 440.0),
            (300.0, 360.0),
            (1200.0, 310.0),
            (10800.0, 274.0),
        ]),
        bike_mass_kg: 8.0,
        cda_m2: 0.32,
        crr: 0.004,
        drivetrain: Some(Drivetrain::Ultegra),
    }
}

#[test]
fn test_limit_power_monotone_in_duration() {
    let r = profile();
    let mut prev = f64::INFINITY;
    for t in [30.0, 60.0, 180.0, 600.0, 1800.0, 7200.0, 21600.0, 36000.0] {
        let p = r.limit_power(t);
        assert!(p <= prev + 1e-9, "limit rose at {t}s: {p} > {prev}");
        prev = p;
    }
}

#[test]
fn test_riegel_tail_from_longest_effort() {
    let r = profile();
    // 7 h from a 3 h best of 274 W: 274 · (7/3)^-0.07 ≈ 258 W.
    let p = r.limit_power(7.0 * 3600.0);
    assert!((p - 258.0).abs() < 1.5, "7h limit {p}");
}

#[test]
fn test_duration_cap_shapes_long_rides() {
    // A one-hour race may surge to 1.2×CP; an eight-hour day caps below CP.
    let short = RiderProfile::duration_cap_factor(1.0);
    let long = RiderProfile::duration_cap_factor(8.0);
    assert!(short > 1.0 && long < 1.0);
    let r = profile();
    assert!(r.power_cap_w(8.0) < r.cp_w);
}

#[test]
fn test_w_prime_round_trip_through_profile() {
    let r = profile();
    let mut w = r.w_prime_balance();
    assert!((w.balance_j() - 19000.0).abs() < 1e-9);

    // A 2-minute surge 100 W over CP costs 12 kJ.
    w.update(381.0, 120.0);
    assert!((w.balance_j() - 7000.0).abs() < 1e-6);
    assert!(!w.is_bonked());

    // Another 75 s of the same pushes it under.
    w.update(381.0, 75.0);
    assert!(w.is_bonked());
}

#[test]
fn test_recovery_depends_on_depth() {
    let mut shallow = WPrimeBalance::new(250.0, 20000.0);
    let mut deep = WPrimeBalance::new(250.0, 20000.0);
    shallow.update(400.0, 60.0); // both down 9 kJ
    deep.update(400.0, 60.0);

    // Same wall-clock recovery, different intensities.
    for _ in 0..30 {
        shallow.update(220.0, 10.0); // 30 W below CP
        deep.update(80.0, 10.0); // 170 W below CP
    }
    assert!(
        deep.balance_j() > shallow.balance_j(),
        "deeper recovery should refill faster: {} vs {}",
        deep.balance_j(),
        shallow.balance_j()
    );
}

#[test]
fn test_efficiency_ordering_across_groupsets() {
    let power = 250.0;
    let top = drivetrain::efficiency_at(Drivetrain::DuraAce.base_efficiency(), power);
    let mid = drivetrain::efficiency_at(Drivetrain::Shimano105.base_efficiency(), power);
    let low = drivetrain::efficiency_at(Drivetrain::Sis.base_efficiency(), power);
    assert!(top > mid && mid > low);
    assert!((0.90..1.0).contains(&top));
}

#[test]
fn test_default_efficiency_without_groupset() {
    let mut r = profile();
    r.drivetrain = None;
    let eta = r.efficiency(250.0);
    let expected = drivetrain::efficiency_at(drivetrain::DEFAULT_BASE_EFFICIENCY, 250.0);
    assert!((eta - expected).abs() < 1e-12);
}

#[test]
fn test_pdc_accepts_unsorted_wire_input() {
    let pdc = PowerDurationCurve::from_points([(1200.0, 310.0), (60.0, 440.0), (300.0, 360.0)]);
    assert_eq!(pdc.len(), 3);
    assert!(pdc.limit_power(60.0) > pdc.limit_power(1200.0));
}
