//! Adaptive segmentation of cleaned trackpoints into atomic segments.
//!
//! The kernel integrates over ~20 m units of uniform grade and heading. A
//! segment closes as soon as it reaches the nominal length, or earlier when
//! the grade drifts from the segment's running average or the road turns.
//! Sub-5 m tail fragments merge into their predecessor so every segment is
//! long enough for the energy-balance step to be meaningful.

use super::{AtomicSegment, TrackPoint};

/// Nominal atomic-segment length in meters.
pub const NOMINAL_LENGTH_M: f64 = 20.0;

/// Close the segment when the start-to-here grade drifts more than this
/// from the segment's running average.
pub const GRADE_TRIGGER: f64 = 0.005;

/// Close the segment when the heading swings more than this (15°).
pub const HEADING_TRIGGER_RAD: f64 = 15.0 * std::f64::consts::PI / 180.0;

/// Fragments shorter than this merge into the previous segment.
pub const MIN_SEGMENT_LENGTH_M: f64 = 5.0;

/// Partition trackpoints into atomic segments covering the course exactly.
pub fn segment(points: &[TrackPoint]) -> Vec<AtomicSegment> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut segments: Vec<AtomicSegment> = Vec::with_capacity(points.len());
    let mut start = 0usize;
    // Average grade of the open segment up to the previous point; the
    // reference the grade trigger compares against.
    let mut running_grade: Option<f64> = None;

    for i in 1..points.len() {
        let length = points[i].distance_m - points[start].distance_m;
        if length <= 0.0 {
            continue;
        }

        let grade_here = (points[i].elevation - points[start].elevation) / length;
        let grade_break = running_grade
            .map(|g| (grade_here - g).abs() > GRADE_TRIGGER)
            .unwrap_or(false);
        // Heading of the last completed step vs the segment's first step.
        let heading_swing = angle_between(points[start].heading_rad, points[i - 1].heading_rad);

        let close =
            length >= NOMINAL_LENGTH_M || grade_break || heading_swing > HEADING_TRIGGER_RAD;
        let last = i == points.len() - 1;

        if close || last {
            segments.push(build_segment(points, start, i));
            start = i;
            running_grade = None;
        } else {
            running_grade = Some(grade_here);
        }
    }

    // Merge a short tail into its predecessor.
    if segments.len() >= 2 {
        let tail = segments[segments.len() - 1];
        if tail.length_m < MIN_SEGMENT_LENGTH_M {
            segments.pop();
            let prev = segments.pop().expect("at least one segment remains");
            segments.push(build_segment(points, prev.start_index, tail.end_index));
        }
    }

    segments
}

fn build_segment(points: &[TrackPoint], start: usize, end: usize) -> AtomicSegment {
    let length = points[end].distance_m - points[start].distance_m;
    let grade = ((points[end].elevation - points[start].elevation) / length)
        .clamp(-super::loader::MAX_GRADE, super::loader::MAX_GRADE);
    AtomicSegment {
        start_index: start,
        end_index: end,
        start_dist_m: points[start].distance_m,
        end_dist_m: points[end].distance_m,
        length_m: length,
        avg_grade: grade,
        avg_heading_rad: circular_mean_heading(points, start, end),
        end_elevation_m: points[end].elevation,
        surface: points[start].surface,
    }
}

/// Length-weighted circular mean of the step headings across the span.
fn circular_mean_heading(points: &[TrackPoint], start: usize, end: usize) -> f64 {
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    for i in start..end {
        let d = points[i + 1].distance_m - points[i].distance_m;
        sin_sum += points[i].heading_rad.sin() * d;
        cos_sum += points[i].heading_rad.cos() * d;
    }
    if sin_sum == 0.0 && cos_sum == 0.0 {
        return points[start].heading_rad;
    }
    sin_sum.atan2(cos_sum).rem_euclid(std::f64::consts::TAU)
}

/// Smallest absolute angle between two bearings.
fn angle_between(a: f64, b: f64) -> f64 {
    let diff = (b - a).rem_euclid(std::f64::consts::TAU);
    diff.min(std::f64::consts::TAU - diff)
}
