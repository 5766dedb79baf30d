//! Per-segment physics: advance the rider across one atomic segment.
//!
//! The advancer solves a force/energy balance: propulsive force from power
//! at the entry speed, resistance from gravity, rolling, and aerodynamic
//! drag, then a work–energy step across the segment length. Low entry
//! speeds fall back to a Newton–Raphson steady-state solve because the
//! force-from-power division degenerates near zero speed. Clamps keep the
//! state physical: a walking floor on climbs, a braking ceiling on coasted
//! descents, and an absolute speed cap.

use crate::rider::RiderProfile;
use crate::sim::{
    SimError, BRAKE_TRIGGER_KMH, COLD_START_KMH, FORCE_CAP_FACTOR, GRAVITY, KMH_PER_MS,
    MIN_PEDAL_SPEED_MS, V_MAX_KMH, WALKING_POWER_W, WALK_SPEED_KMH,
};

/// Newton–Raphson settings for the cold-start steady-state solve.
const COLD_START_GUESS_MS: f64 = 20.0 / KMH_PER_MS;
const COLD_START_TOLERANCE_MS: f64 = 0.05;
const COLD_START_MAX_ITER: usize = 10;

/// Everything the advancer needs to know about one atomic segment.
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub length_m: f64,
    pub grade: f64,
    /// Rolling-resistance coefficient for the segment's surface.
    pub crr: f64,
    /// Along-track wind, m/s; positive is headwind.
    pub headwind_ms: f64,
    /// Air density, kg/m³.
    pub air_density: f64,
    /// Soft-wall braking cap, m/s.
    pub v_brake_ms: f64,
}

/// What happened while crossing a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Cruise,
    ColdStart,
    Walk,
    Braking,
}

/// Output of one advance step.
#[derive(Debug, Clone, Copy)]
pub struct StepResult {
    pub exit_speed_ms: f64,
    pub dt_s: f64,
    /// Power actually delivered (or metabolic cost while walking).
    pub actual_power_w: f64,
    pub phase: Phase,
    /// Capped propulsive force at the entry speed, for energy audits.
    pub propulsive_force_n: f64,
    /// Resistive force at the entry speed, for energy audits.
    pub resistive_force_n: f64,
}

/// Advance the rider across one segment.
pub fn advance(
    rider: &RiderProfile,
    ctx: &StepContext,
    entry_speed_ms: f64,
    target_power_w: f64,
) -> Result<StepResult, SimError> {
    let m = rider.total_mass_kg();
    let norm = (1.0 + ctx.grade * ctx.grade).sqrt();
    let sin_theta = ctx.grade / norm;
    let cos_theta = 1.0 / norm;

    let f_gravity = m * GRAVITY * sin_theta;
    let f_rolling = m * GRAVITY * cos_theta * ctx.crr;
    let half_rho_cda = 0.5 * ctx.air_density * rider.cda_m2;
    let eta = rider.efficiency(target_power_w);

    let v0 = entry_speed_ms.clamp(0.0, V_MAX_KMH / KMH_PER_MS);

    let mut phase;
    let mut exit;
    let mut f_prop = 0.0;
    let mut f_resist = f_gravity + f_rolling;

    if v0 < COLD_START_KMH / KMH_PER_MS && target_power_w > 0.0 {
        // The force-from-power division is meaningless near zero speed;
        // solve the steady-state balance instead.
        phase = Phase::ColdStart;
        exit = steady_state_speed(
            eta * target_power_w,
            f_gravity + f_rolling,
            half_rho_cda,
            ctx.headwind_ms,
        )
        .unwrap_or(0.0);
    } else {
        phase = Phase::Cruise;
        let v_air = v0 + ctx.headwind_ms;
        let f_aero = half_rho_cda * v_air * v_air.abs();
        f_resist = f_gravity + f_rolling + f_aero;
        if target_power_w > 0.0 {
            f_prop = (eta * target_power_w / v0.max(MIN_PEDAL_SPEED_MS))
                .min(FORCE_CAP_FACTOR * m * GRAVITY);
        }
        let accel = (f_prop - f_resist) / m;
        exit = (v0 * v0 + 2.0 * accel * ctx.length_m).max(0.0).sqrt();
    }

    // Safeguards, in order: walking clamp, soft-wall brake, absolute cap.
    let mut walking = false;
    if exit < WALK_SPEED_KMH / KMH_PER_MS && ctx.grade > 0.0 {
        exit = WALK_SPEED_KMH / KMH_PER_MS;
        walking = true;
        phase = Phase::Walk;
    }
    if !walking
        && ctx.grade < 0.0
        && target_power_w <= 0.0
        && exit > BRAKE_TRIGGER_KMH / KMH_PER_MS
    {
        phase = Phase::Braking;
        exit = exit.min(ctx.v_brake_ms);
    }
    exit = exit.min(V_MAX_KMH / KMH_PER_MS);

    let dt_s = if walking {
        // The rider pushes the bike at a constant pace.
        ctx.length_m / (WALK_SPEED_KMH / KMH_PER_MS)
    } else {
        let v_avg = ((v0 + exit) / 2.0).max(0.1);
        ctx.length_m / v_avg
    };

    let actual_power_w = if walking {
        WALKING_POWER_W
    } else if phase == Phase::ColdStart {
        // Steady state: power in equals power out.
        target_power_w
    } else if f_prop > 0.0 {
        f_prop * ctx.length_m / (eta * dt_s)
    } else {
        0.0
    };

    if !(exit.is_finite() && dt_s.is_finite() && actual_power_w.is_finite() && dt_s > 0.0) {
        return Err(SimError::NumericalInstability(format!(
            "non-finite step at grade {:.3} (v0 {:.2} m/s, target {:.0} W)",
            ctx.grade, v0, target_power_w
        )));
    }

    Ok(StepResult {
        exit_speed_ms: exit,
        dt_s,
        actual_power_w,
        phase,
        propulsive_force_n: f_prop,
        resistive_force_n: f_resist,
    })
}

/// Newton–Raphson solve of `v · (½ρCdA·(v+w)|v+w| + F_roll + F_grav) = P`
/// for the steady-state speed. `None` when the iteration fails to converge,
/// which the caller treats as a stall.
fn steady_state_speed(
    p_avail_w: f64,
    f_const: f64,
    half_rho_cda: f64,
    headwind_ms: f64,
) -> Option<f64> {
    let mut v = COLD_START_GUESS_MS;
    for _ in 0..COLD_START_MAX_ITER {
        let v_air = v + headwind_ms;
        let f = v * (half_rho_cda * v_air * v_air.abs() + f_const) - p_avail_w;
        let df = half_rho_cda * v_air * v_air.abs()
            + f_const
            + 2.0 * v * half_rho_cda * v_air.abs();
        if df.abs() < 1e-9 {
            return None;
        }
        let v_next = v - f / df;
        if !v_next.is_finite() {
            return None;
        }
        if (v_next - v).abs() < COLD_START_TOLERANCE_MS {
            return Some(v_next.max(0.0));
        }
        v = v_next.max(0.05);
    }
    None
}
