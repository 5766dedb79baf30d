//! Result aggregation: normalized power, roll-ups, and the final report.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::course::{Course, UserSegment};
use crate::sim::integrator::Trajectory;

/// Rolling window for normalized power, seconds.
const NP_WINDOW_S: f64 = 30.0;

/// Normalized power over samples of irregular duration.
///
/// NP is the fourth root of the time-weighted mean of the fourth power of
/// a 30 s rolling average. Samples arrive per atomic segment, so both the
/// rolling window and the outer mean weight by each sample's duration.
/// Only completed samples ever enter the window: the value never looks at
/// future state.
#[derive(Debug, Clone, Default)]
pub struct NormalizedPower {
    window: VecDeque<(f64, f64)>, // (power_w, dt_s)
    window_power_time: f64,
    window_time: f64,
    fourth_sum: f64,
    fourth_time: f64,
}

impl NormalizedPower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one completed sample.
    pub fn add(&mut self, power_w: f64, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }
        self.window.push_back((power_w, dt_s));
        self.window_power_time += power_w * dt_s;
        self.window_time += dt_s;

        while let Some(&(p, dt)) = self.window.front() {
            if self.window_time - dt < NP_WINDOW_S {
                break;
            }
            self.window.pop_front();
            self.window_power_time -= p * dt;
            self.window_time -= dt;
        }

        // The 4th-power mean only accumulates once a full window exists,
        // matching the convention that NP is undefined for the first 30 s.
        if self.window_time >= NP_WINDOW_S - 1e-9 {
            let rolling_avg = self.window_power_time / self.window_time;
            self.fourth_sum += rolling_avg.powi(4) * dt_s;
            self.fourth_time += dt_s;
        }
    }

    /// Current normalized power; `None` until a full window has elapsed.
    pub fn value(&self) -> Option<f64> {
        if self.fourth_time > 0.0 {
            Some((self.fourth_sum / self.fourth_time).powf(0.25))
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Per-boundary output sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSample {
    pub dist_km: f64,
    pub ele_m: f64,
    pub speed_kmh: f64,
    pub power_w: f64,
    pub time_sec: f64,
    pub w_prime_j: f64,
    pub walking: bool,
}

/// Per-user-segment roll-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSegmentSummary {
    pub id: String,
    pub duration_s: f64,
    pub avg_power_w: f64,
    pub avg_speed_kmh: f64,
}

/// Solver and kernel diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub solver_iterations: u32,
    pub converged: bool,
    pub feasible: bool,
    pub walking_distance_m: f64,
    pub braking_distance_m: f64,
}

/// Final simulation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub base_power_w: f64,
    pub total_time_sec: f64,
    pub avg_speed_kmh: f64,
    pub avg_power_w: f64,
    pub normalized_power_w: f64,
    pub work_kj: f64,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub per_user_segment: Vec<UserSegmentSummary>,
    pub diagnostics: Diagnostics,
    pub samples: Vec<TrackSample>,
}

/// Assemble the report for an accepted trajectory.
pub fn summarize(
    course: &Course,
    trajectory: Trajectory,
    user_segments: &[UserSegment],
    base_power_w: f64,
    diagnostics: Diagnostics,
) -> SimulationReport {
    let total_time = trajectory.finish_time_s;
    let avg_power = if total_time > 0.0 {
        trajectory.total_work_j / total_time
    } else {
        0.0
    };
    let np = trajectory.normalized_power_w.unwrap_or(avg_power);
    let distance_km = course.total_distance_m() / 1000.0;
    let avg_speed = if total_time > 0.0 {
        distance_km * 3600.0 / total_time
    } else {
        0.0
    };

    let per_user_segment = user_segments
        .iter()
        .map(|us| roll_up(us, &trajectory.samples))
        .collect();

    SimulationReport {
        id: Uuid::new_v4(),
        generated_at: Utc::now(),
        base_power_w,
        total_time_sec: total_time,
        avg_speed_kmh: avg_speed,
        avg_power_w: avg_power,
        normalized_power_w: np,
        work_kj: trajectory.total_work_j / 1000.0,
        distance_km,
        elevation_gain_m: course.elevation_gain_m(),
        per_user_segment,
        diagnostics,
        samples: trajectory.samples,
    }
}

/// Time/power/speed roll-up over the samples inside a user segment.
fn roll_up(us: &UserSegment, samples: &[TrackSample]) -> UserSegmentSummary {
    let start_km = us.start_dist_m / 1000.0;
    let end_km = us.end_dist_m / 1000.0;

    let mut duration = 0.0;
    let mut work = 0.0;
    let mut distance_km = 0.0;
    let mut prev_time = 0.0;
    let mut prev_dist = 0.0;

    for s in samples {
        let dt = s.time_sec - prev_time;
        let dd = s.dist_km - prev_dist;
        // The sample closes the interval (prev_dist, dist]; count it when
        // the interval midpoint lies in the user segment.
        let mid = (prev_dist + s.dist_km) / 2.0;
        if mid >= start_km && mid < end_km {
            duration += dt;
            work += s.power_w * dt;
            distance_km += dd;
        }
        prev_time = s.time_sec;
        prev_dist = s.dist_km;
    }

    UserSegmentSummary {
        id: us.id.clone(),
        duration_s: duration,
        avg_power_w: if duration > 0.0 { work / duration } else { 0.0 },
        avg_speed_kmh: if duration > 0.0 {
            distance_km * 3600.0 / duration
        } else {
            0.0
        },
    }
}
