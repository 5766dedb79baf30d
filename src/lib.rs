//! CourseCast - Cycling Pacing Forecaster
//!
//! Predicts the fastest feasible finish time for a rider on a
//! georeferenced course, together with the per-segment power and speed
//! trajectory that achieves it. The pipeline cleans GPS noise into atomic
//! segments, replays a force/energy-balance physics kernel over them, and
//! binary-searches the highest base power the rider's critical-power model
//! and anaerobic reserve (W′) can sustain.

pub mod api;
pub mod course;
pub mod rider;
pub mod sim;

// Re-export commonly used types
pub use api::SimulationRequest;
pub use course::{Course, UserSegment};
pub use rider::{PowerDurationCurve, RiderProfile};
pub use sim::integrator::simulate;
pub use sim::{solve, Environment, SimError, SimulationReport, SolverOptions};

/// Run the full forecast for a request: optimize pacing and aggregate.
pub fn forecast(
    request: SimulationRequest,
    options: &SolverOptions,
) -> Result<SimulationReport, SimError> {
    let (course, rider, environment, user_segments) = request.into_inputs()?;
    sim::solve(&course, &rider, &environment, &user_segments, options)
}
