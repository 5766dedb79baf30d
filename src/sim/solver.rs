//! Pacing optimizer: binary search for the highest sustainable base power.
//!
//! Each candidate base power gets a full forward integration. A trial is
//! feasible when the rider never depletes W′ and the trial's normalized
//! power stays within the PDC limit for the realized duration. Feasible
//! trials raise the lower bound, infeasible ones lower the upper bound;
//! the duration estimate feeding the pacing cap comes from the previous
//! feasible trial so the cap tightens as the forecast sharpens.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::course::{Course, UserSegment};
use crate::rider::RiderProfile;
use crate::sim::aggregate::{self, Diagnostics, SimulationReport};
use crate::sim::integrator::{resolve_overrides, Integrator, Trajectory};
use crate::sim::pacing::PacingPolicy;
use crate::sim::{Environment, SimError, V_BRAKE_DEFAULT_KMH};

/// Lower end of the base-power bracket, watts.
pub const MIN_BASE_POWER_W: f64 = 10.0;

/// Upper end of the base-power bracket, watts.
pub const MAX_BASE_POWER_W: f64 = 1500.0;

/// NP may exceed the PDC limit by this much and still count as feasible.
pub const NP_TOLERANCE_W: f64 = 0.5;

/// Initial duration estimate assumes this average speed, km/h.
const INITIAL_SPEED_ESTIMATE_KMH: f64 = 25.0;

/// Solver knobs.
#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    /// Wall-clock budget; the best feasible trial so far is returned when
    /// it runs out.
    pub deadline: Option<Duration>,
    /// Cooperative cancellation, checked between iterations.
    pub cancel: Option<Arc<AtomicBool>>,
    /// Soft-wall braking cap override, km/h.
    pub v_brake_kmh: Option<f64>,
}

/// Hard iteration cap for the binary search.
const MAX_ITERATIONS: u32 = 30;

/// Bracket width at which the search is converged, watts.
const TOLERANCE_W: f64 = 0.1;

struct Trial {
    p_base: f64,
    trajectory: Trajectory,
    feasible: bool,
}

/// Find the fastest feasible pacing for the course.
pub fn solve(
    course: &Course,
    rider: &RiderProfile,
    env: &Environment,
    user_segments: &[UserSegment],
    options: &SolverOptions,
) -> Result<SimulationReport, SimError> {
    if course.segments().is_empty() {
        return Err(SimError::EmptyCourse);
    }

    let started = Instant::now();
    let overrides = resolve_overrides(course, user_segments);
    let v_brake = options.v_brake_kmh.unwrap_or(V_BRAKE_DEFAULT_KMH);
    let policy = PacingPolicy::default();

    let distance_km = course.total_distance_m() / 1000.0;
    let mut est_hours = distance_km / INITIAL_SPEED_ESTIMATE_KMH;

    let mut low = MIN_BASE_POWER_W;
    let mut high = MAX_BASE_POWER_W;
    let mut best: Option<Trial> = None;
    let mut closest: Option<Trial> = None;
    let mut iterations = 0u32;
    let mut converged = false;

    for _ in 0..MAX_ITERATIONS {
        if let Some(cancel) = &options.cancel {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
        }
        if let Some(budget) = options.deadline {
            if started.elapsed() >= budget {
                tracing::warn!(iterations, "solver deadline reached, returning best so far");
                break;
            }
        }

        let mid = (low + high) / 2.0;
        iterations += 1;

        let cap_w = rider.power_cap_w(est_hours);
        let trial = Integrator::new(
            course, rider, env, policy, mid, cap_w, &overrides, v_brake,
        )
        .run();

        let trial = match trial {
            Ok(t) => t,
            Err(SimError::NumericalInstability(detail)) => {
                // Reject the candidate and keep searching lower.
                tracing::debug!("trial at {mid:.1} W rejected: {detail}");
                high = mid;
                continue;
            }
            Err(e) => return Err(e),
        };

        let finish_s = trial.finish_time_s;
        let avg_power = if finish_s > 0.0 {
            trial.total_work_j / finish_s
        } else {
            0.0
        };
        let np = trial.normalized_power_w.unwrap_or(avg_power);
        let limit = rider.limit_power(finish_s.max(1.0));
        let feasible = !trial.bonked && np <= limit + NP_TOLERANCE_W;

        tracing::debug!(
            "trial p_base={mid:.1}W finish={finish_s:.0}s np={np:.1}W limit={limit:.1}W feasible={feasible}"
        );

        if feasible {
            est_hours = finish_s / 3600.0;
            best = Some(Trial {
                p_base: mid,
                trajectory: trial,
                feasible: true,
            });
            low = mid;
        } else {
            // Track the least-bad failure for the infeasible report.
            let keep = match &closest {
                Some(c) => trial.min_w_prime_j > c.trajectory.min_w_prime_j,
                None => true,
            };
            if keep {
                closest = Some(Trial {
                    p_base: mid,
                    trajectory: trial,
                    feasible: false,
                });
            }
            high = mid;
        }

        if high - low <= TOLERANCE_W {
            converged = true;
            break;
        }
    }

    match best {
        Some(trial) => {
            let diagnostics = Diagnostics {
                solver_iterations: iterations,
                converged,
                feasible: true,
                walking_distance_m: trial.trajectory.walking_distance_m,
                braking_distance_m: trial.trajectory.braking_distance_m,
            };
            tracing::info!(
                "solver finished: p_base={:.1}W finish={:.0}s after {iterations} iterations (converged={converged})",
                trial.p_base,
                trial.trajectory.finish_time_s
            );
            Ok(aggregate::summarize(
                course,
                trial.trajectory,
                user_segments,
                trial.p_base,
                diagnostics,
            ))
        }
        None => match closest {
            Some(trial) => {
                let diagnostics = Diagnostics {
                    solver_iterations: iterations,
                    converged: false,
                    feasible: false,
                    walking_distance_m: trial.trajectory.walking_distance_m,
                    braking_distance_m: trial.trajectory.braking_distance_m,
                };
                debug_assert!(!trial.feasible);
                Err(SimError::InfeasibleCourse {
                    closest: Box::new(aggregate::summarize(
                        course,
                        trial.trajectory,
                        user_segments,
                        trial.p_base,
                        diagnostics,
                    )),
                })
            }
            None => Err(SimError::DeadlineExceeded),
        },
    }
}
