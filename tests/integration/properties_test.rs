//! Quantified output invariants, checked over a varied rolling course.

use coursecast::sim::pacing::PacingPolicy;
use coursecast::sim::{Environment, SolverOptions, V_MAX_KMH};
use coursecast::{simulate, solve};

use crate::common::{course_from_blocks, reference_rider, uniform_course};

/// A 12 km rolling course: flats, climbs, and descents.
fn rolling_course() -> coursecast::Course {
    course_from_blocks(&[
        (2_000.0, 0.0),
        (1_500.0, 0.05),
        (1_000.0, -0.03),
        (2_000.0, 0.08),
        (1_500.0, -0.08),
        (2_000.0, 0.01),
        (2_000.0, -0.01),
    ])
}

#[test]
fn test_distance_and_time_strictly_increase() {
    let course = rolling_course();
    let traj = simulate(
        &course,
        &reference_rider(),
        &Environment::default(),
        PacingPolicy::default(),
        190.0,
        &[],
    )
    .unwrap();

    for w in traj.samples.windows(2) {
        assert!(w[1].dist_km > w[0].dist_km, "distance stalled");
        assert!(w[1].time_sec > w[0].time_sec, "time stalled");
    }
}

#[test]
fn test_speed_floor_on_ridden_climbs_and_global_ceiling() {
    let course = rolling_course();
    let traj = simulate(
        &course,
        &reference_rider(),
        &Environment::default(),
        PacingPolicy::default(),
        190.0,
        &[],
    )
    .unwrap();

    for (seg, s) in course.segments().iter().zip(&traj.samples) {
        if seg.avg_grade > 0.0 && !s.walking {
            assert!(
                s.speed_kmh >= 5.0 - 1e-9,
                "ridden climb below walking pace: {} km/h",
                s.speed_kmh
            );
        }
        assert!(s.speed_kmh <= V_MAX_KMH + 1e-9);
    }
}

#[test]
fn test_average_power_consistent_with_work() {
    let course = rolling_course();
    let rider = reference_rider();
    let env = Environment::default();
    let report = solve(&course, &rider, &env, &[], &SolverOptions::default()).unwrap();

    let mut work = 0.0;
    let mut prev_t = 0.0;
    for s in &report.samples {
        work += s.power_w * (s.time_sec - prev_t);
        prev_t = s.time_sec;
    }
    let avg = work / report.total_time_sec;
    assert!(
        (avg - report.avg_power_w).abs() < 0.5,
        "Σ P·Δt / T = {avg:.2} vs reported {:.2}",
        report.avg_power_w
    );
    assert!((work / 1000.0 - report.work_kj).abs() < 0.5);
}

#[test]
fn test_more_drag_never_finishes_faster() {
    let course = uniform_course(8_000.0, 0.0);
    let env = Environment::default();
    let mut times = Vec::new();
    for cda in [0.25, 0.32, 0.40] {
        let mut rider = reference_rider();
        rider.cda_m2 = cda;
        let traj = simulate(&course, &rider, &env, PacingPolicy::Constant, 200.0, &[]).unwrap();
        times.push(traj.finish_time_s);
    }
    assert!(
        times[0] < times[1] && times[1] < times[2],
        "finish times not monotone in CdA: {times:?}"
    );
}

#[test]
fn test_pipeline_is_bit_deterministic() {
    let course = rolling_course();
    let rider = reference_rider();
    let env = Environment::default();

    let a = solve(&course, &rider, &env, &[], &SolverOptions::default()).unwrap();
    let b = solve(&course, &rider, &env, &[], &SolverOptions::default()).unwrap();

    assert_eq!(a.total_time_sec.to_bits(), b.total_time_sec.to_bits());
    assert_eq!(a.base_power_w.to_bits(), b.base_power_w.to_bits());
    assert_eq!(a.samples, b.samples);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn test_finish_time_equals_last_sample() {
    let course = rolling_course();
    let report = solve(
        &course,
        &reference_rider(),
        &Environment::default(),
        &[],
        &SolverOptions::default(),
    )
    .unwrap();
    let last = report.samples.last().unwrap();
    assert_eq!(report.total_time_sec.to_bits(), last.time_sec.to_bits());
    assert!((last.dist_km - report.distance_km).abs() < 1e-9);
}

#[test]
fn test_user_segment_rollups_partition_the_ride() {
    let course = rolling_course();
    let rider = reference_rider();
    let env = Environment::default();
    let user_segments = vec![
        coursecast::UserSegment::from_span(&course, "first-half".into(), 0.0, 6_000.0, None)
            .unwrap(),
        coursecast::UserSegment::from_span(&course, "second-half".into(), 6_000.0, 12_000.0, None)
            .unwrap(),
    ];
    let report = solve(&course, &rider, &env, &user_segments, &SolverOptions::default()).unwrap();

    assert_eq!(report.per_user_segment.len(), 2);
    let total: f64 = report.per_user_segment.iter().map(|s| s.duration_s).sum();
    assert!(
        (total - report.total_time_sec).abs() < 1.0,
        "roll-ups cover {total:.1} of {:.1} s",
        report.total_time_sec
    );
    for summary in &report.per_user_segment {
        assert!(summary.avg_speed_kmh > 0.0);
        assert!(summary.avg_power_w >= 0.0);
    }
}
