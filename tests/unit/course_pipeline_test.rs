//! Unit tests for the course pipeline: cleaning, segmentation, and the
//! columnar input path, exercised through the public API.

use coursecast::course::{Course, CourseError, RawPoint};

fn raw(lat: f64, lon: f64, ele: f64) -> RawPoint {
    RawPoint {
        latitude: lat,
        longitude: lon,
        elevation: ele,
    }
}

/// Degrees of latitude spanning roughly the given meters.
fn lat_step(meters: f64) -> f64 {
    meters / 111_320.0
}

/// A straight northbound course with ~8 m point spacing.
fn straight_course(length_m: f64, ele: impl Fn(f64) -> f64) -> Course {
    let spacing = 8.0;
    let count = (length_m / spacing) as usize + 1;
    let points: Vec<RawPoint> = (0..count)
        .map(|i| {
            let d = i as f64 * spacing;
            raw(45.0 + d / 111_320.0, 7.0, ele(d))
        })
        .collect();
    Course::from_raw_points(&points).unwrap()
}

#[test]
fn test_pipeline_produces_covering_segments() {
    let course = straight_course(2000.0, |d| 100.0 + d * 0.03);
    assert!(!course.segments().is_empty());

    let mut prev_end = 0.0;
    for seg in course.segments() {
        assert!((seg.start_dist_m - prev_end).abs() < 1e-9, "coverage gap");
        assert!(seg.length_m > 0.0);
        prev_end = seg.end_dist_m;
    }
    assert!((prev_end - course.total_distance_m()).abs() < 1e-9);
}

#[test]
fn test_segment_lengths_stay_in_band() {
    let course = straight_course(1500.0, |d| 100.0 + (d * 0.01).sin() * 5.0);
    let n = course.segments().len();
    for (i, seg) in course.segments().iter().enumerate() {
        assert!(
            seg.length_m >= 5.0 - 1e-9 || i == n - 1,
            "segment {i} is only {} m",
            seg.length_m
        );
        // One extra point step can land just past the nominal cut.
        assert!(seg.length_m <= 30.0, "segment {i} is {} m", seg.length_m);
    }
}

#[test]
fn test_cleaning_already_clean_track_is_noop() {
    // Constant elevation and generous spacing: the second pass through the
    // pipeline must neither drop points nor move anything.
    let spacing = lat_step(10.0);
    let points: Vec<RawPoint> = (0..100)
        .map(|i| raw(45.0 + i as f64 * spacing, 7.0, 250.0))
        .collect();

    let first = Course::from_raw_points(&points).unwrap();
    let again: Vec<RawPoint> = first
        .points()
        .iter()
        .map(|p| raw(p.latitude, p.longitude, p.elevation))
        .collect();
    let second = Course::from_raw_points(&again).unwrap();

    assert_eq!(first.points().len(), second.points().len());
    for (a, b) in first.points().iter().zip(second.points()) {
        assert!((a.distance_m - b.distance_m).abs() < 1e-6);
        assert!((a.elevation - b.elevation).abs() < 1e-9);
        assert!((a.grade - b.grade).abs() < 1e-9);
    }
}

#[test]
fn test_too_few_points_is_empty_course() {
    let err = Course::from_raw_points(&[raw(45.0, 7.0, 100.0)]).unwrap_err();
    assert!(matches!(err, CourseError::EmptyCourse));
}

#[test]
fn test_non_finite_input_is_malformed() {
    let err = Course::from_raw_points(&[
        raw(45.0, 7.0, 100.0),
        raw(45.001, f64::INFINITY, 100.0),
    ])
    .unwrap_err();
    assert!(matches!(err, CourseError::MalformedInput(_)));
}

#[test]
fn test_gain_reported_after_smoothing() {
    // A sawtooth of ±1 m noise on a flat road: raw gain accumulates every
    // uptick, the smoothed profile keeps almost none of it.
    let spacing = lat_step(10.0);
    let points: Vec<RawPoint> = (0..200)
        .map(|i| {
            let noise = if i % 2 == 0 { 0.0 } else { 1.0 };
            raw(45.0 + i as f64 * spacing, 7.0, 300.0 + noise)
        })
        .collect();
    let course = Course::from_raw_points(&points).unwrap();
    assert!(course.raw_elevation_gain_m() > 50.0);
    assert!(course.elevation_gain_m() < course.raw_elevation_gain_m() / 10.0);
}

#[test]
fn test_columnar_and_raw_agree_on_totals() {
    let course = straight_course(800.0, |d| 100.0 + d * 0.04);

    // Re-encode the cleaned course as a columnar payload.
    let points = course.points();
    let payload = coursecast::course::ColumnarCourse {
        points: coursecast::course::ColumnarPoints {
            lat: points.iter().map(|p| p.latitude).collect(),
            lon: points.iter().map(|p| p.longitude).collect(),
            ele: points.iter().map(|p| p.elevation).collect(),
            dist: points.iter().map(|p| p.distance_m).collect(),
            grade: points.iter().map(|p| p.grade).collect(),
            surf: vec![0; points.len()],
        },
        segments: coursecast::course::ColumnarSegments {
            p_start: course.segments().iter().map(|s| s.start_index).collect(),
            p_end: course.segments().iter().map(|s| s.end_index).collect(),
            length: course.segments().iter().map(|s| s.length_m).collect(),
            avg_grade: course.segments().iter().map(|s| s.avg_grade).collect(),
            surf_id: vec![0; course.segments().len()],
            avg_head: course
                .segments()
                .iter()
                .map(|s| s.avg_heading_rad.to_degrees())
                .collect(),
        },
    };
    let rebuilt = Course::from_columnar(&payload).unwrap();

    assert_eq!(rebuilt.segments().len(), course.segments().len());
    assert!((rebuilt.total_distance_m() - course.total_distance_m()).abs() < 1e-6);
    assert!((rebuilt.elevation_gain_m() - course.elevation_gain_m()).abs() < 1e-6);
}

#[test]
fn test_columnar_rejects_decreasing_distance() {
    let payload = coursecast::course::ColumnarCourse {
        points: coursecast::course::ColumnarPoints {
            lat: vec![45.0, 45.001, 45.002],
            lon: vec![7.0; 3],
            ele: vec![100.0; 3],
            dist: vec![0.0, 50.0, 40.0],
            grade: vec![0.0; 3],
            surf: vec![0; 3],
        },
        segments: coursecast::course::ColumnarSegments {
            p_start: vec![0],
            p_end: vec![2],
            length: vec![40.0],
            avg_grade: vec![0.0],
            surf_id: vec![0],
            avg_head: vec![0.0],
        },
    };
    assert!(matches!(
        Course::from_columnar(&payload),
        Err(CourseError::MalformedInput(_))
    ));
}
