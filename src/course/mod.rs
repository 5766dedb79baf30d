//! Course model: cleaned trackpoints and the atomic-segment partition.
//!
//! A `Course` is the immutable, physics-ready form of a route: trackpoints
//! that survived cleaning, plus the atomic segments the kernel integrates
//! over. Courses are built either from raw GPS tuples (full pipeline) or
//! from a pre-refined columnar payload supplied by a map-matching service.

pub mod gpx;
pub mod loader;
pub mod segmenter;
pub mod surface;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use surface::Surface;

/// A raw GPS tuple before any cleaning.
#[derive(Debug, Clone, Copy)]
pub struct RawPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// A cleaned trackpoint.
///
/// Distances are cumulative meters from the course start, grades are
/// dimensionless ratios clamped to ±0.25, headings are initial bearings in
/// radians (0 = north, clockwise).
#[derive(Debug, Clone, Copy)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub distance_m: f64,
    pub grade: f64,
    pub heading_rad: f64,
    pub surface: Surface,
}

/// A physics-unit partition of the course, nominally 20 m long, with
/// uniform grade and heading.
#[derive(Debug, Clone, Copy)]
pub struct AtomicSegment {
    /// Index of the first trackpoint covered by this segment.
    pub start_index: usize,
    /// Index of the last trackpoint covered by this segment.
    pub end_index: usize,
    pub start_dist_m: f64,
    pub end_dist_m: f64,
    pub length_m: f64,
    /// Average grade over the segment, recomputed from Δele / length.
    pub avg_grade: f64,
    /// Circular mean heading in radians.
    pub avg_heading_rad: f64,
    pub end_elevation_m: f64,
    pub surface: Surface,
}

/// Errors from course construction.
#[derive(Debug, Error)]
pub enum CourseError {
    /// Fewer than two points survived cleaning.
    #[error("course has fewer than 2 usable points")]
    EmptyCourse,

    /// Input shape or values are unusable.
    #[error("malformed course input: {0}")]
    MalformedInput(String),
}

/// The immutable course a simulation runs over.
#[derive(Debug, Clone)]
pub struct Course {
    points: Vec<TrackPoint>,
    segments: Vec<AtomicSegment>,
    /// Positive elevation change before smoothing, for reporting.
    raw_gain_m: f64,
}

impl Course {
    /// Build a course from raw GPS tuples: clean, smooth, then segment.
    pub fn from_raw_points(raw: &[RawPoint]) -> Result<Self, CourseError> {
        let raw_gain_m = raw
            .windows(2)
            .map(|w| (w[1].elevation - w[0].elevation).max(0.0))
            .sum();
        let points = loader::clean(raw)?;
        let segments = segmenter::segment(&points);
        Ok(Self {
            points,
            segments,
            raw_gain_m,
        })
    }

    /// Build a course from pre-cleaned columnar arrays.
    ///
    /// The payload is trusted to be clean (the refining service already ran
    /// the pipeline) but its shape is validated: parallel arrays must agree
    /// in length, distances must be monotone, and segment indices must be
    /// in bounds.
    pub fn from_columnar(payload: &ColumnarCourse) -> Result<Self, CourseError> {
        payload.validate()?;

        let pts = &payload.points;
        let n = pts.lat.len();
        let mut points = Vec::with_capacity(n);
        for i in 0..n {
            let heading = if i + 1 < n {
                loader::initial_bearing(pts.lat[i], pts.lon[i], pts.lat[i + 1], pts.lon[i + 1])
            } else if n >= 2 {
                loader::initial_bearing(pts.lat[n - 2], pts.lon[n - 2], pts.lat[i], pts.lon[i])
            } else {
                0.0
            };
            points.push(TrackPoint {
                latitude: pts.lat[i],
                longitude: pts.lon[i],
                elevation: pts.ele[i],
                distance_m: pts.dist[i],
                grade: pts
                    .grade
                    .get(i)
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(-loader::MAX_GRADE, loader::MAX_GRADE),
                heading_rad: heading,
                surface: Surface::from_id(pts.surf.get(i).copied().unwrap_or(0)),
            });
        }

        let segs = &payload.segments;
        let mut segments = Vec::with_capacity(segs.p_start.len());
        for i in 0..segs.p_start.len() {
            let start = segs.p_start[i].min(n - 1);
            let end = segs.p_end[i].min(n - 1);
            segments.push(AtomicSegment {
                start_index: start,
                end_index: end,
                start_dist_m: points[start].distance_m,
                end_dist_m: points[end].distance_m,
                length_m: segs.length[i],
                avg_grade: segs.avg_grade[i].clamp(-loader::MAX_GRADE, loader::MAX_GRADE),
                avg_heading_rad: segs.avg_head.get(i).copied().unwrap_or(0.0).to_radians(),
                end_elevation_m: points[end].elevation,
                surface: Surface::from_id(segs.surf_id.get(i).copied().unwrap_or(0)),
            });
        }

        let raw_gain_m = points
            .windows(2)
            .map(|w| (w[1].elevation - w[0].elevation).max(0.0))
            .sum();

        Ok(Self {
            points,
            segments,
            raw_gain_m,
        })
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn segments(&self) -> &[AtomicSegment] {
        &self.segments
    }

    pub fn total_distance_m(&self) -> f64 {
        self.segments.last().map(|s| s.end_dist_m).unwrap_or(0.0)
    }

    /// Positive elevation change over the smoothed profile.
    pub fn elevation_gain_m(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].elevation - w[0].elevation).max(0.0))
            .sum()
    }

    /// Positive elevation change of the raw input, before smoothing.
    pub fn raw_elevation_gain_m(&self) -> f64 {
        self.raw_gain_m
    }
}

/// Pre-refined columnar course payload, as produced by a map-matching
/// service. Distances in meters, grades as ratios, headings in degrees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnarCourse {
    pub points: ColumnarPoints,
    pub segments: ColumnarSegments,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnarPoints {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub ele: Vec<f64>,
    pub dist: Vec<f64>,
    #[serde(default)]
    pub grade: Vec<f64>,
    #[serde(default)]
    pub surf: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnarSegments {
    pub p_start: Vec<usize>,
    pub p_end: Vec<usize>,
    pub length: Vec<f64>,
    pub avg_grade: Vec<f64>,
    #[serde(default)]
    pub surf_id: Vec<u8>,
    #[serde(default)]
    pub avg_head: Vec<f64>,
}

impl ColumnarCourse {
    fn validate(&self) -> Result<(), CourseError> {
        let n = self.points.lat.len();
        if n < 2 {
            return Err(CourseError::EmptyCourse);
        }
        if self.points.lon.len() != n || self.points.ele.len() != n || self.points.dist.len() != n {
            return Err(CourseError::MalformedInput(
                "points arrays differ in length".into(),
            ));
        }
        if !self.points.grade.is_empty() && self.points.grade.len() != n {
            return Err(CourseError::MalformedInput(
                "points.grade length does not match points.lat".into(),
            ));
        }
        let m = self.segments.p_start.len();
        if m == 0 {
            return Err(CourseError::MalformedInput("no segments".into()));
        }
        if self.segments.p_end.len() != m
            || self.segments.length.len() != m
            || self.segments.avg_grade.len() != m
        {
            return Err(CourseError::MalformedInput(
                "segments arrays differ in length".into(),
            ));
        }
        for (i, w) in self.points.dist.windows(2).enumerate() {
            if w[1] < w[0] {
                return Err(CourseError::MalformedInput(format!(
                    "points.dist decreases at index {}",
                    i + 1
                )));
            }
        }
        for (i, (&s, &e)) in self
            .segments
            .p_start
            .iter()
            .zip(&self.segments.p_end)
            .enumerate()
        {
            if s >= n || e >= n || e < s {
                return Err(CourseError::MalformedInput(format!(
                    "segment {i} has out-of-range point indices"
                )));
            }
            if self.segments.length[i] <= 0.0 || !self.segments.length[i].is_finite() {
                return Err(CourseError::MalformedInput(format!(
                    "segment {i} has non-positive length"
                )));
            }
        }
        let finite = |v: &[f64]| v.iter().all(|x| x.is_finite());
        if !finite(&self.points.lat)
            || !finite(&self.points.lon)
            || !finite(&self.points.ele)
            || !finite(&self.points.dist)
        {
            return Err(CourseError::MalformedInput(
                "non-finite value in points arrays".into(),
            ));
        }
        Ok(())
    }
}

/// Classification of a named user segment by its average grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserSegmentKind {
    Up,
    Flat,
    Down,
}

/// A named span of the course, optionally carrying a target-power override
/// that replaces the pacing strategy inside it.
#[derive(Debug, Clone)]
pub struct UserSegment {
    pub id: String,
    pub start_dist_m: f64,
    pub end_dist_m: f64,
    pub kind: UserSegmentKind,
    pub avg_grade: f64,
    pub target_power_w: Option<f64>,
}

/// Grade beyond which a user segment counts as climbing or descending.
const USER_SEGMENT_GRADE_SPLIT: f64 = 0.01;

impl UserSegment {
    /// Resolve a requested span against the course, classifying it by the
    /// elevation change across the covered distance.
    pub fn from_span(
        course: &Course,
        id: String,
        start_dist_m: f64,
        end_dist_m: f64,
        target_power_w: Option<f64>,
    ) -> Result<Self, CourseError> {
        if !(start_dist_m.is_finite() && end_dist_m.is_finite()) || end_dist_m <= start_dist_m {
            return Err(CourseError::MalformedInput(format!(
                "user segment '{id}' must satisfy end_dist_m > start_dist_m"
            )));
        }
        let mut rise = 0.0;
        let mut run = 0.0;
        for seg in course.segments() {
            if seg.end_dist_m <= start_dist_m || seg.start_dist_m >= end_dist_m {
                continue;
            }
            rise += seg.avg_grade * seg.length_m;
            run += seg.length_m;
        }
        let avg_grade = if run > 0.0 { rise / run } else { 0.0 };
        let kind = if avg_grade > USER_SEGMENT_GRADE_SPLIT {
            UserSegmentKind::Up
        } else if avg_grade < -USER_SEGMENT_GRADE_SPLIT {
            UserSegmentKind::Down
        } else {
            UserSegmentKind::Flat
        };
        Ok(Self {
            id,
            start_dist_m,
            end_dist_m,
            kind,
            avg_grade,
            target_power_w,
        })
    }

    /// Whether an atomic segment lies inside this span.
    pub fn contains(&self, seg: &AtomicSegment) -> bool {
        seg.start_dist_m >= self.start_dist_m - 1e-9 && seg.end_dist_m <= self.end_dist_m + 1e-9
    }
}
