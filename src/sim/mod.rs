//! Simulation kernel: physics, pacing, forward integration, and the
//! pacing optimizer.
//!
//! The kernel is pure and deterministic: it performs no I/O, owns its
//! per-trial state, and shares the course, rider, and environment
//! immutably across solver trials.

pub mod aggregate;
pub mod environment;
pub mod integrator;
pub mod pacing;
pub mod physics;
pub mod solver;

use thiserror::Error;

pub use aggregate::{Diagnostics, SimulationReport, TrackSample, UserSegmentSummary};
pub use environment::Environment;
pub use integrator::{Integrator, Trajectory};
pub use pacing::PacingPolicy;
pub use solver::{solve, SolverOptions};

/// Gravitational acceleration, m/s².
pub const GRAVITY: f64 = 9.798;

/// Absolute speed cap, km/h.
pub const V_MAX_KMH: f64 = 100.0;

/// Default soft-wall braking cap on coasted descents, km/h.
pub const V_BRAKE_DEFAULT_KMH: f64 = 65.0;

/// Coasted-descent speed above which the soft wall engages, km/h.
pub const BRAKE_TRIGGER_KMH: f64 = 50.0;

/// Hike-a-bike speed, km/h.
pub const WALK_SPEED_KMH: f64 = 5.0;

/// Entry speeds below this take the steady-state cold-start path, km/h.
pub const COLD_START_KMH: f64 = 3.0;

/// Metabolic cost recorded while pushing the bike, watts.
pub const WALKING_POWER_W: f64 = 30.0;

/// Floor on the speed used to convert power into propulsive force, m/s.
pub const MIN_PEDAL_SPEED_MS: f64 = 0.2;

/// Torque-limited force cap as a multiple of system weight (tire grip).
pub const FORCE_CAP_FACTOR: f64 = 1.5;

pub const KMH_PER_MS: f64 = 3.6;

/// Kernel and solver failures that reach the caller.
#[derive(Debug, Error)]
pub enum SimError {
    /// Input shape or values are unusable; the message names the path.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Fewer than two course points survived cleaning.
    #[error("course has fewer than 2 usable points")]
    EmptyCourse,

    /// No base power ≥ 10 W completes the course without depleting W′.
    /// Carries the closest-to-feasible trial for inspection.
    #[error("no feasible pacing found")]
    InfeasibleCourse {
        closest: Box<SimulationReport>,
    },

    /// A non-finite value escaped the kernel safeguards.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// The solver deadline elapsed before any feasible trial finished.
    #[error("solver deadline exceeded before a feasible trial was found")]
    DeadlineExceeded,
}

impl From<crate::course::CourseError> for SimError {
    fn from(err: crate::course::CourseError) -> Self {
        match err {
            crate::course::CourseError::EmptyCourse => SimError::EmptyCourse,
            crate::course::CourseError::MalformedInput(detail) => SimError::MalformedInput(detail),
        }
    }
}
