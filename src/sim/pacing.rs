//! Pacing strategy: map grade and base power to a per-segment target.
//!
//! Three regimes: spend extra on climbs where aero losses are small, hold
//! momentum on flats and false descents, and coast where gravity already
//! provides more speed than pedaling could add. The result is clamped by a
//! duration-dependent ceiling so a short course cannot be paced like a
//! sprint.

use crate::rider::RiderProfile;
use crate::sim::physics::StepContext;
use crate::sim::{GRAVITY, KMH_PER_MS};

/// Default climb aggressiveness: watts scale with 1 + α·grade.
pub const ALPHA_UP_DEFAULT: f64 = 2.5;

/// Grade below which the rider coasts outright.
pub const COAST_GRADE: f64 = -0.02;

/// Fraction of base power held through the momentum regime.
pub const MOMENTUM_FACTOR: f64 = 0.8;

/// Speed the momentum regime tries to sustain, km/h.
pub const MOMENTUM_SPEED_KMH: f64 = 35.0;

/// How per-segment target power is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacingPolicy {
    /// Ride the base power everywhere (fixed-power studies).
    Constant,
    /// The three-regime grade policy.
    Adaptive { alpha_up: f64 },
}

impl Default for PacingPolicy {
    fn default() -> Self {
        PacingPolicy::Adaptive {
            alpha_up: ALPHA_UP_DEFAULT,
        }
    }
}

/// Target power for one segment.
///
/// `override_w` (a user-segment target) replaces the policy regimes but
/// is still subject to `cap_w`, the duration-dependent ceiling supplied
/// by the solver; the same cap clamps the policy output.
pub fn target_power(
    policy: PacingPolicy,
    rider: &RiderProfile,
    ctx: &StepContext,
    p_base: f64,
    cap_w: f64,
    override_w: Option<f64>,
) -> f64 {
    if let Some(w) = override_w {
        return w.max(0.0).min(cap_w);
    }

    let raw = match policy {
        PacingPolicy::Constant => p_base,
        PacingPolicy::Adaptive { alpha_up } => {
            if ctx.grade > 0.0 {
                p_base * (1.0 + alpha_up * ctx.grade)
            } else if ctx.grade >= COAST_GRADE {
                (MOMENTUM_FACTOR * p_base).max(holding_power(rider, ctx))
            } else {
                0.0
            }
        }
    };

    raw.min(cap_w)
}

/// Power needed to hold the momentum-regime speed against this segment's
/// forces. Zero when gravity alone sustains it.
fn holding_power(rider: &RiderProfile, ctx: &StepContext) -> f64 {
    let v = MOMENTUM_SPEED_KMH / KMH_PER_MS;
    let m = rider.total_mass_kg();
    let norm = (1.0 + ctx.grade * ctx.grade).sqrt();
    let f_gravity = m * GRAVITY * ctx.grade / norm;
    let f_rolling = m * GRAVITY * ctx.crr / norm;
    let v_air = v + ctx.headwind_ms;
    let f_aero = 0.5 * ctx.air_density * rider.cda_m2 * v_air * v_air.abs();

    let f_total = f_gravity + f_rolling + f_aero;
    if f_total <= 0.0 {
        return 0.0;
    }
    let wheel_w = f_total * v;
    wheel_w / rider.efficiency(wheel_w)
}
