//! Ambient conditions: temperature, altitude, and a global wind vector.

use serde::{Deserialize, Serialize};

/// Ambient conditions for a simulation run.
///
/// The wind is a single vector for the whole course; each segment resolves
/// its own along-track component from its heading. Bearing follows the
/// meteorological convention: the direction the wind blows *from*, so a
/// rider heading into the bearing faces a headwind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Environment {
    /// Air temperature in °C.
    pub temp_c: f64,
    /// Course base altitude in meters.
    pub altitude_m: f64,
    /// Wind speed in m/s.
    pub wind_speed_mps: f64,
    /// Wind bearing in radians (0 = from north, clockwise).
    pub wind_bearing_rad: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            temp_c: 20.0,
            altitude_m: 0.0,
            wind_speed_mps: 0.0,
            wind_bearing_rad: 0.0,
        }
    }
}

impl Environment {
    /// Air density adjusted for temperature and altitude, kg/m³.
    pub fn air_density(&self) -> f64 {
        (1.293 - 0.00426 * self.temp_c) * (-0.709 * self.altitude_m / 7000.0).exp()
    }

    /// Along-track wind component for a segment heading, m/s.
    /// Positive means headwind.
    pub fn headwind_component(&self, heading_rad: f64) -> f64 {
        self.wind_speed_mps * (self.wind_bearing_rad - heading_rad).cos()
    }

    /// Check value ranges; returns the offending field name on failure.
    pub fn validate(&self) -> Result<(), String> {
        if !self.temp_c.is_finite() || !(-40.0..=60.0).contains(&self.temp_c) {
            return Err("temp_c must be within [-40, 60]".into());
        }
        if !self.wind_speed_mps.is_finite() || self.wind_speed_mps < 0.0 {
            return Err("wind_speed_mps must be non-negative".into());
        }
        if !self.altitude_m.is_finite() || !self.wind_bearing_rad.is_finite() {
            return Err("altitude_m and wind_bearing_deg must be finite".into());
        }
        Ok(())
    }
}
