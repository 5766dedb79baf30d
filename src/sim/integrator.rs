//! Forward integration: replay the rider over the course, one atomic
//! segment at a time.
//!
//! The integrator is a lazy iterator over boundary samples so the
//! aggregator can fold rolling statistics in a single pass, and it is
//! cheap to restart: the solver creates a fresh one per trial while
//! sharing the immutable course, rider, and environment.

use crate::course::{Course, UserSegment};
use crate::rider::{RiderProfile, WPrimeBalance};
use crate::sim::aggregate::{NormalizedPower, TrackSample};
use crate::sim::environment::Environment;
use crate::sim::pacing::{self, PacingPolicy};
use crate::sim::physics::{self, Phase, StepContext};
use crate::sim::{SimError, KMH_PER_MS, V_BRAKE_DEFAULT_KMH};

/// One emitted integration step: the boundary sample plus bookkeeping the
/// aggregator wants.
#[derive(Debug, Clone, Copy)]
pub struct Step {
    pub sample: TrackSample,
    pub phase: Phase,
    pub length_m: f64,
    pub dt_s: f64,
}

/// Completed (or aborted) forward pass.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub samples: Vec<TrackSample>,
    /// W′ went below zero; the pass stopped at the failing segment.
    pub bonked: bool,
    pub finish_time_s: f64,
    pub total_work_j: f64,
    /// `None` when the ride is shorter than the NP window.
    pub normalized_power_w: Option<f64>,
    pub min_w_prime_j: f64,
    pub walking_distance_m: f64,
    pub braking_distance_m: f64,
}

/// Lazy per-segment integrator.
pub struct Integrator<'a> {
    course: &'a Course,
    rider: &'a RiderProfile,
    policy: PacingPolicy,
    p_base: f64,
    /// Duration-dependent power ceiling for this trial.
    cap_w: f64,
    overrides: &'a [Option<f64>],
    air_density: f64,
    headwinds: Vec<f64>,
    v_brake_ms: f64,

    index: usize,
    speed_ms: f64,
    time_s: f64,
    wprime: WPrimeBalance,
    halted: bool,
}

impl<'a> Integrator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        course: &'a Course,
        rider: &'a RiderProfile,
        env: &Environment,
        policy: PacingPolicy,
        p_base: f64,
        cap_w: f64,
        overrides: &'a [Option<f64>],
        v_brake_kmh: f64,
    ) -> Self {
        let headwinds = course
            .segments()
            .iter()
            .map(|s| env.headwind_component(s.avg_heading_rad))
            .collect();
        Self {
            course,
            rider,
            policy,
            p_base,
            cap_w,
            overrides,
            air_density: env.air_density(),
            headwinds,
            v_brake_ms: v_brake_kmh / KMH_PER_MS,
            index: 0,
            speed_ms: 0.0,
            time_s: 0.0,
            wprime: rider.w_prime_balance(),
            halted: false,
        }
    }

    fn advance_one(&mut self) -> Option<Result<Step, SimError>> {
        if self.halted || self.index >= self.course.segments().len() {
            return None;
        }
        let seg = &self.course.segments()[self.index];
        let ctx = StepContext {
            length_m: seg.length_m,
            grade: seg.avg_grade,
            crr: seg.surface.crr().unwrap_or(self.rider.crr),
            headwind_ms: self.headwinds[self.index],
            air_density: self.air_density,
            v_brake_ms: self.v_brake_ms,
        };
        let override_w = self.overrides.get(self.index).copied().flatten();
        let target = pacing::target_power(
            self.policy,
            self.rider,
            &ctx,
            self.p_base,
            self.cap_w,
            override_w,
        );

        let step = match physics::advance(self.rider, &ctx, self.speed_ms, target) {
            Ok(s) => s,
            Err(e) => {
                self.halted = true;
                return Some(Err(e));
            }
        };

        self.wprime.update(step.actual_power_w, step.dt_s);
        self.speed_ms = step.exit_speed_ms;
        self.time_s += step.dt_s;
        self.index += 1;

        let sample = TrackSample {
            dist_km: seg.end_dist_m / 1000.0,
            ele_m: seg.end_elevation_m,
            speed_kmh: step.exit_speed_ms * KMH_PER_MS,
            power_w: step.actual_power_w,
            time_sec: self.time_s,
            w_prime_j: self.wprime.balance_j(),
            walking: step.phase == Phase::Walk,
        };

        if self.wprime.is_bonked() {
            // Terminal for this trial; the sample showing the depleted
            // balance is still emitted for diagnostics.
            self.halted = true;
        }

        Some(Ok(Step {
            sample,
            phase: step.phase,
            length_m: seg.length_m,
            dt_s: step.dt_s,
        }))
    }

    pub fn is_bonked(&self) -> bool {
        self.wprime.is_bonked()
    }

    /// Drain the iterator into a trajectory, folding rolling statistics.
    pub fn run(mut self) -> Result<Trajectory, SimError> {
        let mut samples = Vec::with_capacity(self.course.segments().len());
        let mut np = NormalizedPower::new();
        let mut work = 0.0;
        let mut min_w = self.wprime.balance_j();
        let mut walking_m = 0.0;
        let mut braking_m = 0.0;

        while let Some(step) = self.advance_one() {
            let step = step?;
            work += step.sample.power_w * step.dt_s;
            np.add(step.sample.power_w, step.dt_s);
            min_w = min_w.min(step.sample.w_prime_j);
            match step.phase {
                Phase::Walk => walking_m += step.length_m,
                Phase::Braking => braking_m += step.length_m,
                _ => {}
            }
            samples.push(step.sample);
        }

        Ok(Trajectory {
            bonked: self.wprime.is_bonked(),
            finish_time_s: samples.last().map(|s| s.time_sec).unwrap_or(0.0),
            total_work_j: work,
            normalized_power_w: np.value(),
            min_w_prime_j: min_w,
            walking_distance_m: walking_m,
            braking_distance_m: braking_m,
            samples,
        })
    }
}

impl Iterator for Integrator<'_> {
    type Item = Result<Step, SimError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance_one()
    }
}

/// Map user-segment power overrides onto atomic segments.
pub fn resolve_overrides(course: &Course, user_segments: &[UserSegment]) -> Vec<Option<f64>> {
    course
        .segments()
        .iter()
        .map(|seg| {
            user_segments
                .iter()
                .find(|us| us.target_power_w.is_some() && us.contains(seg))
                .and_then(|us| us.target_power_w)
        })
        .collect()
}

/// Run a single forward pass at a fixed base power.
///
/// The duration cap for pacing is seeded from the 25 km/h heuristic the
/// solver also starts from.
pub fn simulate(
    course: &Course,
    rider: &RiderProfile,
    env: &Environment,
    policy: PacingPolicy,
    p_base: f64,
    user_segments: &[UserSegment],
) -> Result<Trajectory, SimError> {
    if course.segments().is_empty() {
        return Err(SimError::EmptyCourse);
    }
    let est_hours = course.total_distance_m() / 1000.0 / 25.0;
    let cap_w = rider.power_cap_w(est_hours);
    let overrides = resolve_overrides(course, user_segments);
    Integrator::new(
        course,
        rider,
        env,
        policy,
        p_base,
        cap_w,
        &overrides,
        V_BRAKE_DEFAULT_KMH,
    )
    .run()
}
