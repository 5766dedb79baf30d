//! Wire payloads: what collaborators send in and get back.
//!
//! The kernel itself never touches JSON; this module is the narrow waist
//! where request shapes are validated and converted into kernel inputs.
//! Validation errors name the offending field path so a caller can fix
//! its payload without reading kernel code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::course::{ColumnarCourse, Course, RawPoint, UserSegment};
use crate::rider::{Drivetrain, PowerDurationCurve, RiderProfile};
use crate::sim::{Environment, SimError};

/// A complete simulation request.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationRequest {
    pub course: CourseInput,
    pub rider: RiderSpec,
    #[serde(default)]
    pub environment: EnvironmentSpec,
    #[serde(default)]
    pub user_segments: Vec<UserSegmentSpec>,
}

/// Raw trackpoints or a pre-refined columnar course.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CourseInput {
    Columnar(ColumnarCourse),
    Raw(Vec<RawPointSpec>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawPointSpec {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub ele: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiderSpec {
    pub mass_kg: f64,
    pub cp_w: f64,
    pub w_prime_j: f64,
    /// Duration in seconds (as a string key, JSON-object style) → watts.
    #[serde(default)]
    pub pdc: BTreeMap<String, f64>,
    pub cda_m2: f64,
    pub crr: f64,
    pub bike_mass_kg: f64,
    #[serde(default)]
    pub drivetrain_key: Option<Drivetrain>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct EnvironmentSpec {
    pub temp_c: f64,
    pub altitude_m: f64,
    pub wind_speed_mps: f64,
    pub wind_bearing_deg: f64,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            temp_c: 20.0,
            altitude_m: 0.0,
            wind_speed_mps: 0.0,
            wind_bearing_deg: 0.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserSegmentSpec {
    pub id: String,
    pub start_dist_m: f64,
    pub end_dist_m: f64,
    #[serde(default)]
    pub target_power_w: Option<f64>,
}

impl SimulationRequest {
    /// Validate and convert into kernel inputs.
    pub fn into_inputs(
        self,
    ) -> Result<(Course, RiderProfile, Environment, Vec<UserSegment>), SimError> {
        let course = self.course.build()?;
        let rider = self.rider.build()?;
        let environment = self.environment.build()?;

        let mut user_segments = Vec::with_capacity(self.user_segments.len());
        for spec in self.user_segments {
            if let Some(p) = spec.target_power_w {
                if !p.is_finite() || p < 0.0 {
                    return Err(SimError::MalformedInput(format!(
                        "user_segments['{}'].target_power_w must be non-negative",
                        spec.id
                    )));
                }
            }
            user_segments.push(UserSegment::from_span(
                &course,
                spec.id,
                spec.start_dist_m,
                spec.end_dist_m,
                spec.target_power_w,
            )?);
        }

        Ok((course, rider, environment, user_segments))
    }
}

impl CourseInput {
    pub fn build(self) -> Result<Course, SimError> {
        match self {
            CourseInput::Raw(points) => {
                let raw: Vec<RawPoint> = points
                    .iter()
                    .map(|p| RawPoint {
                        latitude: p.lat,
                        longitude: p.lon,
                        elevation: p.ele,
                    })
                    .collect();
                Ok(Course::from_raw_points(&raw)?)
            }
            CourseInput::Columnar(payload) => Ok(Course::from_columnar(&payload)?),
        }
    }
}

impl RiderSpec {
    pub fn build(self) -> Result<RiderProfile, SimError> {
        let field = |name: &str, ok: bool| -> Result<(), SimError> {
            if ok {
                Ok(())
            } else {
                Err(SimError::MalformedInput(format!("rider.{name}")))
            }
        };
        field("mass_kg must be positive", self.mass_kg.is_finite() && self.mass_kg > 0.0)?;
        field("cp_w must be positive", self.cp_w.is_finite() && self.cp_w > 0.0)?;
        field(
            "w_prime_j must be non-negative",
            self.w_prime_j.is_finite() && self.w_prime_j >= 0.0,
        )?;
        field(
            "bike_mass_kg must be non-negative",
            self.bike_mass_kg.is_finite() && self.bike_mass_kg >= 0.0,
        )?;
        field("cda_m2 must be positive", self.cda_m2.is_finite() && self.cda_m2 > 0.0)?;
        field("crr must be positive", self.crr.is_finite() && self.crr > 0.0)?;

        let pdc = if self.pdc.is_empty() {
            // No tested curve supplied; fall back to the CP model.
            PowerDurationCurve::from_cp_model(self.cp_w, self.w_prime_j)
        } else {
            let mut pairs = Vec::with_capacity(self.pdc.len());
            for (key, watts) in &self.pdc {
                let duration: f64 = key.parse().map_err(|_| {
                    SimError::MalformedInput(format!(
                        "rider.pdc key '{key}' is not a duration in seconds"
                    ))
                })?;
                if duration <= 0.0 || !watts.is_finite() || *watts < 0.0 {
                    return Err(SimError::MalformedInput(format!(
                        "rider.pdc['{key}'] must map a positive duration to non-negative watts"
                    )));
                }
                pairs.push((duration, *watts));
            }
            PowerDurationCurve::from_points(pairs)
        };
        if pdc.is_empty() {
            return Err(SimError::MalformedInput("rider.pdc has no usable points".into()));
        }

        Ok(RiderProfile {
            mass_kg: self.mass_kg,
            cp_w: self.cp_w,
            w_prime_j: self.w_prime_j,
            pdc,
            bike_mass_kg: self.bike_mass_kg,
            cda_m2: self.cda_m2,
            crr: self.crr,
            drivetrain: self.drivetrain_key,
        })
    }
}

impl EnvironmentSpec {
    pub fn build(self) -> Result<Environment, SimError> {
        let env = Environment {
            temp_c: self.temp_c,
            altitude_m: self.altitude_m,
            wind_speed_mps: self.wind_speed_mps,
            wind_bearing_rad: self.wind_bearing_deg.to_radians(),
        };
        env.validate()
            .map_err(|msg| SimError::MalformedInput(format!("environment.{msg}")))?;
        Ok(env)
    }
}
