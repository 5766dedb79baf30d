//! Course cleaning: turn noisy GPS tuples into stable trackpoints.
//!
//! GPS traces carry two kinds of noise this pipeline has to absorb before
//! any physics runs: jittered positions a few meters apart (which blow up
//! grade denominators) and barometric/DEM elevation wobble. The pipeline is
//! prune → smooth → recompute distance → clamp grade → heading.

use super::{CourseError, RawPoint, Surface, TrackPoint};

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Points closer than this to the previous retained point are dropped.
pub const MIN_POINT_SPACING_M: f64 = 5.0;

/// Centered moving-average window for elevation smoothing.
pub const SMOOTHING_WINDOW: usize = 10;

/// Grades are clamped to ±this ratio.
pub const MAX_GRADE: f64 = 0.25;

/// Great-circle distance between two coordinates (haversine).
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from the first coordinate to the second, in radians,
/// normalized to [0, 2π).
pub fn initial_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_lon = (lon2 - lon1).to_radians();

    let y = d_lon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lon.cos();
    let bearing = y.atan2(x);

    bearing.rem_euclid(std::f64::consts::TAU)
}

/// Run the full cleaning pipeline over raw GPS tuples.
///
/// Fails with `MalformedInput` on non-finite coordinates and `EmptyCourse`
/// when fewer than two points survive pruning.
pub fn clean(raw: &[RawPoint]) -> Result<Vec<TrackPoint>, CourseError> {
    for (i, p) in raw.iter().enumerate() {
        if !(p.latitude.is_finite() && p.longitude.is_finite() && p.elevation.is_finite()) {
            return Err(CourseError::MalformedInput(format!(
                "point {i}: non-finite coordinate"
            )));
        }
        if p.latitude.abs() > 90.0 || p.longitude.abs() > 180.0 {
            return Err(CourseError::MalformedInput(format!(
                "point {i}: coordinate out of range"
            )));
        }
    }

    // Minimum-distance pruning against the last retained point.
    let mut kept: Vec<RawPoint> = Vec::with_capacity(raw.len());
    for p in raw {
        match kept.last() {
            Some(prev) => {
                let d = haversine_distance(prev.latitude, prev.longitude, p.latitude, p.longitude);
                if d >= MIN_POINT_SPACING_M {
                    kept.push(*p);
                }
            }
            None => kept.push(*p),
        }
    }

    if kept.len() < 2 {
        return Err(CourseError::EmptyCourse);
    }

    let elevations: Vec<f64> = kept.iter().map(|p| p.elevation).collect();
    let smoothed = moving_average(&elevations, SMOOTHING_WINDOW);

    // Cumulative distance over the pruned sequence.
    let mut distances = Vec::with_capacity(kept.len());
    let mut total = 0.0;
    distances.push(0.0);
    for w in kept.windows(2) {
        total += haversine_distance(w[0].latitude, w[0].longitude, w[1].latitude, w[1].longitude);
        distances.push(total);
    }

    let n = kept.len();
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let grade = if i == 0 {
            0.0
        } else {
            let run = distances[i] - distances[i - 1];
            ((smoothed[i] - smoothed[i - 1]) / run).clamp(-MAX_GRADE, MAX_GRADE)
        };
        let heading = if i + 1 < n {
            initial_bearing(
                kept[i].latitude,
                kept[i].longitude,
                kept[i + 1].latitude,
                kept[i + 1].longitude,
            )
        } else {
            // Last point repeats the previous bearing.
            points
                .last()
                .map(|p: &TrackPoint| p.heading_rad)
                .unwrap_or(0.0)
        };
        points.push(TrackPoint {
            latitude: kept[i].latitude,
            longitude: kept[i].longitude,
            elevation: smoothed[i],
            distance_m: distances[i],
            grade,
            heading_rad: heading,
            surface: Surface::Unknown,
        });
    }

    Ok(points)
}

/// Centered moving average; the window is truncated at the ends.
fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    let n = values.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(n);
        let slice = &values[start..end];
        out.push(slice.iter().sum::<f64>() / slice.len() as f64);
    }
    out
}
