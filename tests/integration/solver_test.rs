//! Solver behavior: convergence against the PDC limit, infeasible
//! courses, deadlines, and cancellation.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use coursecast::rider::{Drivetrain, PowerDurationCurve, RiderProfile};
use coursecast::sim::solver::NP_TOLERANCE_W;
use coursecast::sim::{Environment, SimError, SolverOptions};
use coursecast::{solve, UserSegment};

use crate::common::{course_from_blocks, reference_rider, uniform_course};

/// A mountainous 155 km stage: ten 7 km climbs at 6% with matching
/// descents, then 15 km of flat. Total gain 4200 m.
fn mountain_stage() -> coursecast::Course {
    let mut blocks = Vec::new();
    for _ in 0..10 {
        blocks.push((7_000.0, 0.06));
        blocks.push((7_000.0, -0.06));
    }
    blocks.push((15_000.0, 0.0));
    course_from_blocks(&blocks)
}

/// The S5 rider: CP 281 with a tested curve whose Riegel tail gives about
/// 258 W at seven hours.
fn stage_rider() -> RiderProfile {
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
fn test_mountain_stage_converges_against_pdc_limit() {
    let course = mountain_stage();
    let rider = stage_rider();
    let report = solve(
        &course,
        &rider,
        &Environment::default(),
        &[],
        &SolverOptions::default(),
    )
    .unwrap();

    assert!(report.diagnostics.feasible);
    assert!(report.diagnostics.converged);
    assert!(report.diagnostics.solver_iterations <= 30);

    // A 155 km / 4200 m stage lands somewhere between 4.5 and 8 hours.
    let hours = report.total_time_sec / 3600.0;
    assert!((4.5..8.0).contains(&hours), "stage took {hours:.2} h");

    // The accepted trial sits against the duration-adjusted PDC limit.
    let limit = rider.limit_power(report.total_time_sec);
    assert!(
        report.normalized_power_w <= limit + NP_TOLERANCE_W + 1e-9,
        "NP {:.1} above limit {limit:.1}",
        report.normalized_power_w
    );
    assert!(
        limit - report.normalized_power_w < 8.0,
        "solver left {:.1} W on the table (NP {:.1}, limit {limit:.1})",
        limit - report.normalized_power_w,
        report.normalized_power_w
    );
}

#[test]
fn test_forced_override_makes_course_infeasible() {
    // A user segment pinned at 500 W rides at the duration cap (300 W for
    // this rider on a short course), still 50 W over CP. Held for 8 km
    // that burns W′ in every trial no matter how low the base power goes.
    let course = uniform_course(10_000.0, 0.0);
    let rider = reference_rider();
    let segment =
        UserSegment::from_span(&course, "sprint".into(), 1_000.0, 9_000.0, Some(500.0)).unwrap();

    let err = solve(
        &course,
        &rider,
        &Environment::default(),
        &[segment],
        &SolverOptions::default(),
    )
    .unwrap_err();

    match err {
        SimError::InfeasibleCourse { closest } => {
            assert!(!closest.diagnostics.feasible);
            assert!(closest.samples.last().unwrap().w_prime_j < 0.0);
        }
        other => panic!("expected InfeasibleCourse, got {other:?}"),
    }
}

#[test]
fn test_zero_deadline_is_an_error() {
    // With no budget at all, not even one trial runs.
    let course = mountain_stage();
    let err = solve(
        &course,
        &stage_rider(),
        &Environment::default(),
        &[],
        &SolverOptions {
            deadline: Some(Duration::ZERO),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, SimError::DeadlineExceeded));
}

#[test]
fn test_cancellation_is_cooperative() {
    let course = uniform_course(10_000.0, 0.0);
    let cancel = Arc::new(AtomicBool::new(true));
    let err = solve(
        &course,
        &reference_rider(),
        &Environment::default(),
        &[],
        &SolverOptions {
            cancel: Some(cancel),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, SimError::DeadlineExceeded));
}

#[test]
fn test_harder_stage_predicts_longer_time() {
    let flat = uniform_course(40_000.0, 0.0);
    let hilly = course_from_blocks(&[
        (10_000.0, 0.0),
        (10_000.0, 0.05),
        (10_000.0, -0.05),
        (10_000.0, 0.0),
    ]);
    let rider = reference_rider();
    let env = Environment::default();
    let t_flat = solve(&flat, &rider, &env, &[], &SolverOptions::default())
        .unwrap()
        .total_time_sec;
    let t_hilly = solve(&hilly, &rider, &env, &[], &SolverOptions::default())
        .unwrap()
        .total_time_sec;
    assert!(t_hilly > t_flat, "hills cannot be free: {t_hilly} vs {t_flat}");
}
