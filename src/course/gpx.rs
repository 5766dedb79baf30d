//! GPX parsing into raw course points.
//!
//! Only positions and elevations matter to the forecaster; timestamps and
//! extensions are ignored. Tracks are preferred, then routes, then bare
//! waypoints.

use super::{CourseError, RawPoint};

/// Parse GPX content into raw points.
pub fn parse_gpx(content: &[u8]) -> Result<Vec<RawPoint>, CourseError> {
    let data: gpx::Gpx = gpx::read(content)
        .map_err(|e| CourseError::MalformedInput(format!("GPX parse error: {e}")))?;

    let mut points = Vec::new();

    for track in &data.tracks {
        for segment in &track.segments {
            for wp in &segment.points {
                points.push(waypoint_to_raw(wp));
            }
        }
    }

    if points.is_empty() {
        for route in &data.routes {
            for wp in &route.points {
                points.push(waypoint_to_raw(wp));
            }
        }
    }

    if points.is_empty() {
        for wp in &data.waypoints {
            points.push(waypoint_to_raw(wp));
        }
    }

    if points.is_empty() {
        return Err(CourseError::MalformedInput(
            "no GPS points found in GPX file".into(),
        ));
    }

    Ok(points)
}

/// Extract a display name from the GPX metadata, if any.
pub fn extract_name(content: &[u8]) -> Option<String> {
    let data: gpx::Gpx = gpx::read(content).ok()?;

    if let Some(name) = data.tracks.first().and_then(|t| t.name.clone()) {
        return Some(name);
    }
    if let Some(name) = data.routes.first().and_then(|r| r.name.clone()) {
        return Some(name);
    }
    data.metadata.and_then(|m| m.name)
}

fn waypoint_to_raw(wp: &gpx::Waypoint) -> RawPoint {
    RawPoint {
        latitude: wp.point().y(),
        longitude: wp.point().x(),
        elevation: wp.elevation.unwrap_or(0.0),
    }
}
