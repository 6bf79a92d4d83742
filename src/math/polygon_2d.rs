use super::{Point3, Vector3, TOLERANCE};
use crate::error::{GeometryError, Result};

/// Computes the signed area of a polygon in the XY plane (shoelace formula).
///
/// Positive for counter-clockwise, negative for clockwise.
#[must_use]
pub fn signed_area_2d(points: &[Point3]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum * 0.5
}

/// Rotates a closed polygon so it starts at the leftmost vertex (smallest x),
/// breaking ties by smallest y. Ensures deterministic output for tests.
#[must_use]
pub fn rotate_to_canonical_start(points: &[Point3]) -> Vec<Point3> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let mut best = 0;
    for (i, pt) in points.iter().enumerate().skip(1) {
        let b = &points[best];
        if pt.x < b.x - TOLERANCE || (pt.x - b.x).abs() < TOLERANCE && pt.y < b.y {
            best = i;
        }
    }
    if best == 0 {
        return points.to_vec();
    }
    let mut rotated = Vec::with_capacity(points.len());
    rotated.extend_from_slice(&points[best..]);
    rotated.extend_from_slice(&points[..best]);
    rotated
}

/// Computes the normalized direction from point `a` to point `b`.
///
/// # Errors
///
/// Returns `GeometryError::Degenerate` if the segment has zero length.
pub fn segment_direction(a: &Point3, b: &Point3) -> Result<Vector3> {
    let d = b - a;
    let len = (d.x * d.x + d.y * d.y).sqrt();
    if len < TOLERANCE {
        return Err(GeometryError::Degenerate(format!(
            "zero-length segment between ({}, {}) and ({}, {})",
            a.x, a.y, b.x, b.y
        ))
        .into());
    }
    Ok(Vector3::new(d.x / len, d.y / len, 0.0))
}

/// Returns the left-pointing normal of a direction vector in the XY plane.
#[must_use]
pub fn left_normal(dir: Vector3) -> Vector3 {
    Vector3::new(-dir.y, dir.x, 0.0)
}

/// Where a point sits relative to a closed polygon in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    Inside,
    Outside,
    OnBoundary,
}

/// Tests whether `p` lies on the segment `a`-`b` within tolerance,
/// considering only the XY plane.
#[must_use]
pub fn point_on_segment_2d(p: &Point3, a: &Point3, b: &Point3) -> bool {
    let d = Vector3::new(b.x - a.x, b.y - a.y, 0.0);
    let len_sq = d.x * d.x + d.y * d.y;
    if len_sq < TOLERANCE * TOLERANCE {
        let dx = p.x - a.x;
        let dy = p.y - a.y;
        return (dx * dx + dy * dy).sqrt() < TOLERANCE;
    }
    let t = ((p.x - a.x) * d.x + (p.y - a.y) * d.y) / len_sq;
    if t < -TOLERANCE || t > 1.0 + TOLERANCE {
        return false;
    }
    let t = t.clamp(0.0, 1.0);
    let cx = a.x + d.x * t;
    let cy = a.y + d.y * t;
    let dx = p.x - cx;
    let dy = p.y - cy;
    (dx * dx + dy * dy).sqrt() < TOLERANCE
}

/// Classifies a point against a closed polygon ring in the XY plane.
///
/// Uses an even-odd ray cast toward +x, so the ring's winding does not
/// matter. Points within tolerance of an edge report `OnBoundary`.
#[must_use]
pub fn point_in_polygon(p: &Point3, ring: &[Point3]) -> PointLocation {
    let n = ring.len();
    if n < 3 {
        return PointLocation::Outside;
    }
    for i in 0..n {
        let j = (i + 1) % n;
        if point_on_segment_2d(p, &ring[i], &ring[j]) {
            return PointLocation::OnBoundary;
        }
    }
    let mut inside = false;
    for i in 0..n {
        let j = (i + 1) % n;
        let (a, b) = (&ring[i], &ring[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_hit = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if x_hit > p.x {
                inside = !inside;
            }
        }
    }
    if inside {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn signed_area_ccw_square() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let area = signed_area_2d(&pts);
        assert!((area - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_cw_square() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let area = signed_area_2d(&pts);
        assert!((area + 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn signed_area_degenerate() {
        assert!((signed_area_2d(&[Point3::new(0.0, 0.0, 0.0)])).abs() < TOLERANCE);
        assert!((signed_area_2d(&[])).abs() < TOLERANCE);
    }

    #[test]
    fn canonical_start_already_leftmost() {
        let pts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let rotated = rotate_to_canonical_start(&pts);
        assert!((rotated[0].x).abs() < TOLERANCE);
        assert!((rotated[0].y).abs() < TOLERANCE);
    }

    #[test]
    fn canonical_start_rotation() {
        let pts = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
        ];
        let rotated = rotate_to_canonical_start(&pts);
        assert!((rotated[0].x).abs() < TOLERANCE);
        assert!((rotated[0].y).abs() < TOLERANCE);
    }

    #[test]
    fn segment_direction_basic() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(3.0, 4.0, 0.0);
        let dir = segment_direction(&a, &b).unwrap();
        assert!((dir.x - 0.6).abs() < TOLERANCE);
        assert!((dir.y - 0.8).abs() < TOLERANCE);
    }

    #[test]
    fn segment_direction_zero_length() {
        let a = Point3::new(1.0, 1.0, 0.0);
        let b = Point3::new(1.0, 1.0, 0.0);
        assert!(segment_direction(&a, &b).is_err());
    }

    #[test]
    fn left_normal_basic() {
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let n = left_normal(dir);
        assert!((n.x).abs() < TOLERANCE);
        assert!((n.y - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn point_on_segment_hit_and_miss() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        assert!(point_on_segment_2d(&Point3::new(1.0, 0.0, 0.0), &a, &b));
        assert!(point_on_segment_2d(&Point3::new(2.0, 0.0, 0.0), &a, &b));
        assert!(!point_on_segment_2d(&Point3::new(1.0, 0.5, 0.0), &a, &b));
        assert!(!point_on_segment_2d(&Point3::new(3.0, 0.0, 0.0), &a, &b));
    }

    #[test]
    fn point_in_polygon_square() {
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        assert_eq!(
            point_in_polygon(&Point3::new(1.0, 1.0, 0.0), &ring),
            PointLocation::Inside
        );
        assert_eq!(
            point_in_polygon(&Point3::new(3.0, 1.0, 0.0), &ring),
            PointLocation::Outside
        );
        assert_eq!(
            point_in_polygon(&Point3::new(2.0, 1.0, 0.0), &ring),
            PointLocation::OnBoundary
        );
        assert_eq!(
            point_in_polygon(&Point3::new(0.0, 0.0, 0.0), &ring),
            PointLocation::OnBoundary
        );
    }

    #[test]
    fn point_in_polygon_concave_pocket() {
        // L-shape; the notch at the upper right is outside.
        let ring = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(3.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, 3.0, 0.0),
            Point3::new(0.0, 3.0, 0.0),
        ];
        assert_eq!(
            point_in_polygon(&Point3::new(2.0, 2.0, 0.0), &ring),
            PointLocation::Outside
        );
        assert_eq!(
            point_in_polygon(&Point3::new(0.5, 2.0, 0.0), &ring),
            PointLocation::Inside
        );
        assert_eq!(
            point_in_polygon(&Point3::new(2.0, 0.5, 0.0), &ring),
            PointLocation::Inside
        );
    }

    #[test]
    fn point_in_polygon_winding_independent() {
        let ccw = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let cw: Vec<Point3> = ccw.iter().rev().copied().collect();
        let p = Point3::new(0.5, 0.5, 0.0);
        assert_eq!(point_in_polygon(&p, &ccw), PointLocation::Inside);
        assert_eq!(point_in_polygon(&p, &cw), PointLocation::Inside);
    }
}
