//! Eye and mouth aspect ratios from facial landmarks
//!
//! Both ratios are scale invariant: vertical openings divided by twice the
//! horizontal width of the contour. Low EAR means closed eyes, high MAR
//! means an open mouth.

use crate::{DmsError, LandmarkScheme};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Horizontal widths below this make a ratio meaningless
const MIN_HORIZONTAL_DISTANCE: f64 = 1e-6;

/// 2D landmark point (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Eye and mouth ratios measured on one face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Mean EAR of both eyes
    pub ear: f64,
    pub mar: f64,
}

/// Eye aspect ratio over 6 contour points:
/// `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`
pub fn eye_aspect_ratio(eye: &[Point]) -> Result<f64, DmsError> {
    if eye.len() < 6 {
        return Err(DmsError::KeypointsMissing);
    }
    ratio(
        eye[1].distance(&eye[5]),
        eye[2].distance(&eye[4]),
        eye[0].distance(&eye[3]),
    )
}

/// Mouth aspect ratio over the mouth contour (at least 11 points):
/// `(|p2-p10| + |p4-p8|) / (2 * |p0-p6|)`
pub fn mouth_aspect_ratio(mouth: &[Point]) -> Result<f64, DmsError> {
    if mouth.len() < 11 {
        return Err(DmsError::KeypointsMissing);
    }
    ratio(
        mouth[2].distance(&mouth[10]),
        mouth[4].distance(&mouth[8]),
        mouth[0].distance(&mouth[6]),
    )
}

fn ratio(vertical_1: f64, vertical_2: f64, horizontal: f64) -> Result<f64, DmsError> {
    // Non-finite coordinates make every distance undefined
    if !(vertical_1.is_finite() && vertical_2.is_finite() && horizontal.is_finite()) {
        return Err(DmsError::DegenerateGeometry);
    }
    if horizontal < MIN_HORIZONTAL_DISTANCE {
        return Err(DmsError::DegenerateGeometry);
    }
    Ok((vertical_1 + vertical_2) / (2.0 * horizontal))
}

fn contour<'a>(landmarks: &'a [Point], range: &Range<usize>) -> Result<&'a [Point], DmsError> {
    landmarks.get(range.clone()).ok_or(DmsError::KeypointsMissing)
}

/// Slice a face landmark set by `scheme` and compute both ratios
pub fn measure(landmarks: &[Point], scheme: &LandmarkScheme) -> Result<Measurement, DmsError> {
    if landmarks.len() < scheme.required_points() {
        return Err(DmsError::KeypointsMissing);
    }

    let left = eye_aspect_ratio(contour(landmarks, &scheme.left_eye)?)?;
    let right = eye_aspect_ratio(contour(landmarks, &scheme.right_eye)?)?;
    let mar = mouth_aspect_ratio(contour(landmarks, &scheme.mouth)?)?;

    Ok(Measurement {
        ear: (left + right) / 2.0,
        mar,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Eye 10px wide, `half_height` above and below the corner line
    fn eye(cx: f64, half_height: f64) -> Vec<Point> {
        vec![
            Point::new(cx, 0.0),
            Point::new(cx + 3.0, -half_height),
            Point::new(cx + 7.0, -half_height),
            Point::new(cx + 10.0, 0.0),
            Point::new(cx + 7.0, half_height),
            Point::new(cx + 3.0, half_height),
        ]
    }

    /// 20-point mouth, 20px wide, `half_open` vertical opening at 2/10 and 4/8
    fn mouth(half_open: f64) -> Vec<Point> {
        let mut pts = vec![Point::default(); 20];
        pts[0] = Point::new(0.0, 40.0);
        pts[6] = Point::new(20.0, 40.0);
        pts[2] = Point::new(7.0, 40.0 - half_open);
        pts[10] = Point::new(7.0, 40.0 + half_open);
        pts[4] = Point::new(13.0, 40.0 - half_open);
        pts[8] = Point::new(13.0, 40.0 + half_open);
        pts
    }

    #[test]
    fn test_eye_aspect_ratio() {
        // (2h + 2h) / (2 * 10) = h / 5
        let ear = eye_aspect_ratio(&eye(0.0, 1.5)).unwrap();
        assert!((ear - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_mouth_aspect_ratio() {
        // (2v + 2v) / (2 * 20) = v / 10
        let mar = mouth_aspect_ratio(&mouth(8.0)).unwrap();
        assert!((mar - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_ratio_is_scale_invariant() {
        let scaled: Vec<Point> = eye(5.0, 1.0)
            .into_iter()
            .map(|p| Point::new(p.x * 4.0, p.y * 4.0))
            .collect();
        let a = eye_aspect_ratio(&eye(5.0, 1.0)).unwrap();
        let b = eye_aspect_ratio(&scaled).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_points() {
        assert!(matches!(eye_aspect_ratio(&eye(0.0, 1.0)[..5]), Err(DmsError::KeypointsMissing)));
        assert!(matches!(mouth_aspect_ratio(&mouth(1.0)[..10]), Err(DmsError::KeypointsMissing)));
    }

    #[test]
    fn test_degenerate_width() {
        let collapsed = vec![Point::new(1.0, 1.0); 6];
        assert!(matches!(eye_aspect_ratio(&collapsed), Err(DmsError::DegenerateGeometry)));

        let mut nan_eye = eye(0.0, 1.0);
        nan_eye[3] = Point::new(f64::NAN, 0.0);
        assert!(matches!(eye_aspect_ratio(&nan_eye), Err(DmsError::DegenerateGeometry)));
    }

    #[test]
    fn test_non_finite_opening_is_degenerate() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut eye_pts = eye(0.0, 1.0);
            eye_pts[1] = Point::new(3.0, bad);
            assert!(
                matches!(eye_aspect_ratio(&eye_pts), Err(DmsError::DegenerateGeometry)),
                "eye with y = {}",
                bad
            );

            let mut mouth_pts = mouth(2.0);
            mouth_pts[8] = Point::new(bad, 42.0);
            assert!(
                matches!(mouth_aspect_ratio(&mouth_pts), Err(DmsError::DegenerateGeometry)),
                "mouth with x = {}",
                bad
            );
        }

        // Infinite width would otherwise read as a fully closed eye
        let mut wide = eye(0.0, 1.0);
        wide[3] = Point::new(f64::INFINITY, 0.0);
        assert!(matches!(eye_aspect_ratio(&wide), Err(DmsError::DegenerateGeometry)));
    }

    #[test]
    fn test_measure_rejects_reversed_range() {
        let landmarks = vec![Point::new(1.0, 2.0); 68];
        #[allow(clippy::reversed_empty_ranges)]
        let scheme = LandmarkScheme {
            left_eye: 50..44,
            ..LandmarkScheme::ibug_68()
        };
        assert!(matches!(measure(&landmarks, &scheme), Err(DmsError::KeypointsMissing)));
    }

    #[test]
    fn test_measure_uses_scheme() {
        let mut landmarks = vec![Point::default(); 68];
        landmarks[36..42].copy_from_slice(&eye(0.0, 1.0));
        landmarks[42..48].copy_from_slice(&eye(30.0, 2.0));
        landmarks[48..68].copy_from_slice(&mouth(3.0));

        let m = measure(&landmarks, &LandmarkScheme::ibug_68()).unwrap();
        assert!((m.ear - 0.3).abs() < 1e-12); // mean of 0.2 and 0.4
        assert!((m.mar - 0.3).abs() < 1e-12);

        assert!(matches!(
            measure(&landmarks[..60], &LandmarkScheme::ibug_68()),
            Err(DmsError::KeypointsMissing)
        ));
    }
}
