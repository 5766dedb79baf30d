//! Power–duration curve storage and lookups.
//!
//! The PDC maps a sustainable duration to the best average power the rider
//! can hold for it. Inside the curve's domain lookups interpolate linearly
//! in log-duration space (power–duration relationships are close to linear
//! there); beyond the longest tested duration the Riegel fatigue model
//! extrapolates the tail.

use serde::{Deserialize, Serialize};

/// Riegel fatigue exponent for extrapolation past the longest PDC effort.
pub const RIEGEL_EXPONENT: f64 = 0.07;

/// A single point on the power duration curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdcPoint {
    /// Duration in seconds.
    pub duration_s: f64,
    /// Best average power at this duration, in watts.
    pub power_w: f64,
}

/// Sanitized power–duration curve.
///
/// Construction sorts by duration, collapses duplicate durations to their
/// best power, and enforces monotone non-increasing power so a sloppy input
/// curve cannot report a *higher* sustainable power at a *longer* duration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PowerDurationCurve {
    points: Vec<PdcPoint>,
}

impl PowerDurationCurve {
    /// Build a sanitized curve from arbitrary (duration, power) pairs.
    /// Non-positive durations and non-finite entries are discarded.
    pub fn from_points(raw: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<PdcPoint> = raw
            .into_iter()
            .filter(|(d, p)| d.is_finite() && p.is_finite() && *d > 0.0 && *p >= 0.0)
            .map(|(duration_s, power_w)| PdcPoint {
                duration_s,
                power_w,
            })
            .collect();

        points.sort_by(|a, b| a.duration_s.total_cmp(&b.duration_s));

        // Collapse duplicate durations to the best power.
        let mut collapsed: Vec<PdcPoint> = Vec::with_capacity(points.len());
        for p in points {
            match collapsed.last_mut() {
                Some(last) if (last.duration_s - p.duration_s).abs() < f64::EPSILON => {
                    last.power_w = last.power_w.max(p.power_w);
                }
                _ => collapsed.push(p),
            }
        }

        // Monotone non-increasing power in duration.
        let mut ceiling = f64::INFINITY;
        for p in &mut collapsed {
            ceiling = ceiling.min(p.power_w);
            p.power_w = ceiling;
        }

        Self { points: collapsed }
    }

    /// Build the classic two-parameter curve `P(t) = CP + W'/t` at a set of
    /// standard durations. Used when a rider supplies CP and W' but no
    /// tested curve.
    pub fn from_cp_model(cp_w: f64, w_prime_j: f64) -> Self {
        const ANCHORS_S: [f64; 6] = [60.0, 300.0, 600.0, 1200.0, 2400.0, 3600.0];
        Self::from_points(
            ANCHORS_S
                .iter()
                .map(|&t| (t, cp_w + w_prime_j / t)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[PdcPoint] {
        &self.points
    }

    /// Longest tested duration, if the curve is non-empty.
    pub fn max_duration_s(&self) -> Option<f64> {
        self.points.last().map(|p| p.duration_s)
    }

    /// Best sustainable power for the given duration.
    ///
    /// Log-duration interpolation inside the domain; Riegel extrapolation
    /// `P = P_last · (T / T_last)^(-0.07)` beyond it; the shortest tested
    /// power below it. Returns 0 for an empty curve.
    pub fn limit_power(&self, duration_s: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return 0.0,
        };
        if duration_s <= first.duration_s {
            return first.power_w;
        }
        if duration_s >= last.duration_s {
            return last.power_w * (duration_s / last.duration_s).powf(-RIEGEL_EXPONENT);
        }

        // Find the bracketing pair and interpolate in ln(duration).
        let idx = self
            .points
            .partition_point(|p| p.duration_s < duration_s);
        let lo = self.points[idx - 1];
        let hi = self.points[idx];
        let t = (duration_s.ln() - lo.duration_s.ln()) / (hi.duration_s.ln() - lo.duration_s.ln());
        lo.power_w + t * (hi.power_w - lo.power_w)
    }
}
