//! Rider model: physiology (CP, W′, PDC) and equipment.

pub mod drivetrain;
pub mod pdc;
pub mod wprime;

pub use drivetrain::Drivetrain;
pub use pdc::{PdcPoint, PowerDurationCurve};
pub use wprime::WPrimeBalance;

/// Helmet, shoes, and a full bottle, added to rider + bike mass.
pub const GEAR_MASS_KG: f64 = 1.0;

/// Duration-dependent power ceiling anchors: (hours, multiple of CP).
/// Short events tolerate VO2max surges; all-day rides cap below CP.
const DURATION_CAP_ANCHORS: [(f64, f64); 4] =
    [(1.0, 1.20), (3.0, 1.10), (5.0, 1.05), (8.0, 0.95)];

/// A rider's physiological limits and equipment coefficients.
#[derive(Debug, Clone)]
pub struct RiderProfile {
    /// Body mass in kilograms.
    pub mass_kg: f64,
    /// Critical power in watts.
    pub cp_w: f64,
    /// Anaerobic work capacity in joules.
    pub w_prime_j: f64,
    /// Tested power–duration curve.
    pub pdc: PowerDurationCurve,
    /// Bike mass in kilograms.
    pub bike_mass_kg: f64,
    /// Drag area in m².
    pub cda_m2: f64,
    /// Baseline rolling-resistance coefficient, used on unknown surfaces.
    pub crr: f64,
    /// Groupset; `None` uses the default base efficiency.
    pub drivetrain: Option<Drivetrain>,
}

impl RiderProfile {
    /// Total moving mass: rider + bike + gear.
    pub fn total_mass_kg(&self) -> f64 {
        self.mass_kg + self.bike_mass_kg + GEAR_MASS_KG
    }

    /// Drivetrain efficiency at the given power.
    pub fn efficiency(&self, power_w: f64) -> f64 {
        let base = self
            .drivetrain
            .map(Drivetrain::base_efficiency)
            .unwrap_or(drivetrain::DEFAULT_BASE_EFFICIENCY);
        drivetrain::efficiency_at(base, power_w)
    }

    /// Best sustainable power for a duration, from the PDC.
    pub fn limit_power(&self, duration_s: f64) -> f64 {
        self.pdc.limit_power(duration_s)
    }

    /// Power ceiling for a ride of the estimated duration, as a multiple
    /// of CP. Linear between the anchor points, saturating outside.
    pub fn duration_cap_factor(hours: f64) -> f64 {
        let anchors = &DURATION_CAP_ANCHORS;
        if hours <= anchors[0].0 {
            return anchors[0].1;
        }
        if hours >= anchors[anchors.len() - 1].0 {
            return anchors[anchors.len() - 1].1;
        }
        for pair in anchors.windows(2) {
            let (t0, f0) = pair[0];
            let (t1, f1) = pair[1];
            if hours <= t1 {
                return f0 + (f1 - f0) * (hours - t0) / (t1 - t0);
            }
        }
        anchors[anchors.len() - 1].1
    }

    /// Absolute power ceiling in watts for the estimated duration.
    pub fn power_cap_w(&self, hours: f64) -> f64 {
        Self::duration_cap_factor(hours) * self.cp_w
    }

    /// Fresh W′ tracker for a simulation trial.
    pub fn w_prime_balance(&self) -> WPrimeBalance {
        WPrimeBalance::new(self.cp_w, self.w_prime_j)
    }
}
