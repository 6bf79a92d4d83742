use super::{Point3, Vector3, TOLERANCE};

/// Outcome of a bounded segment-segment intersection test.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentIntersection {
    /// The segments cross at a single point. `t` parametrises the first
    /// segment, `u` the second, both in `[0, 1]`.
    Proper { point: Point3, t: f64, u: f64 },
    /// The segments share a carrier line and overlap over `[t0, t1]` on the
    /// first segment's parameter range. A single-point touch has `t0 == t1`.
    Collinear { t0: f64, t1: f64 },
}

/// Bounded segment-segment intersection in 2D.
///
/// Returns `None` when the segments are disjoint, including the parallel
/// non-collinear case. Collinear segments report their parameter overlap on
/// the first segment rather than a single point.
#[must_use]
pub fn segment_segment_intersect_2d(
    a0: &Point3,
    a1: &Point3,
    b0: &Point3,
    b1: &Point3,
) -> Option<SegmentIntersection> {
    let da = Vector3::new(a1.x - a0.x, a1.y - a0.y, 0.0);
    let db = Vector3::new(b1.x - b0.x, b1.y - b0.y, 0.0);

    let dx = b0.x - a0.x;
    let dy = b0.y - a0.y;

    let cross = da.x * db.y - da.y * db.x;
    if cross.abs() < TOLERANCE {
        let len_a_sq = da.x * da.x + da.y * da.y;
        if len_a_sq < TOLERANCE * TOLERANCE {
            return None;
        }
        // Perpendicular distance of b0 from the first segment's carrier.
        let perp = (dx * da.y - dy * da.x).abs() / len_a_sq.sqrt();
        if perp > TOLERANCE {
            return None;
        }
        // Same carrier: project the second segment's endpoints onto the first.
        let t_b0 = (dx * da.x + dy * da.y) / len_a_sq;
        let t_b1 = ((b1.x - a0.x) * da.x + (b1.y - a0.y) * da.y) / len_a_sq;
        let (lo, hi) = if t_b0 <= t_b1 { (t_b0, t_b1) } else { (t_b1, t_b0) };
        let t0 = lo.max(0.0);
        let t1 = hi.min(1.0);
        if t0 > t1 + TOLERANCE {
            return None;
        }
        return Some(SegmentIntersection::Collinear { t0, t1: t1.max(t0) });
    }

    let t = (dx * db.y - dy * db.x) / cross;
    let u = (dx * da.y - dy * da.x) / cross;

    // Use a small epsilon to include endpoints.
    let eps = TOLERANCE;
    if t >= -eps && t <= 1.0 + eps && u >= -eps && u <= 1.0 + eps {
        let t_clamped = t.clamp(0.0, 1.0);
        let pt = Point3::new(a0.x + da.x * t_clamped, a0.y + da.y * t_clamped, a0.z);
        Some(SegmentIntersection::Proper {
            point: pt,
            t: t_clamped,
            u: u.clamp(0.0, 1.0),
        })
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn segment_segment_crossing() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(2.0, 2.0, 0.0);
        let b0 = Point3::new(0.0, 2.0, 0.0);
        let b1 = Point3::new(2.0, 0.0, 0.0);
        let Some(SegmentIntersection::Proper { point, t, u }) =
            segment_segment_intersect_2d(&a0, &a1, &b0, &b1)
        else {
            panic!("expected a proper crossing");
        };
        assert!((point.x - 1.0).abs() < TOLERANCE);
        assert!((point.y - 1.0).abs() < TOLERANCE);
        assert!((t - 0.5).abs() < TOLERANCE);
        assert!((u - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn segment_segment_no_crossing() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(1.0, 0.0, 0.0);
        let b0 = Point3::new(0.0, 1.0, 0.0);
        let b1 = Point3::new(1.0, 1.0, 0.0);
        assert!(segment_segment_intersect_2d(&a0, &a1, &b0, &b1).is_none());
    }

    #[test]
    fn segment_segment_endpoint_touch() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(1.0, 0.0, 0.0);
        let b0 = Point3::new(1.0, 0.0, 0.0);
        let b1 = Point3::new(1.0, 1.0, 0.0);
        let Some(SegmentIntersection::Proper { point, t, u }) =
            segment_segment_intersect_2d(&a0, &a1, &b0, &b1)
        else {
            panic!("expected an endpoint touch");
        };
        assert!((point.x - 1.0).abs() < TOLERANCE);
        assert!(point.y.abs() < TOLERANCE);
        assert!((t - 1.0).abs() < TOLERANCE);
        assert!(u.abs() < TOLERANCE);
    }

    #[test]
    fn segment_segment_parallel_offset_is_none() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(2.0, 0.0, 0.0);
        let b0 = Point3::new(0.0, 0.5, 0.0);
        let b1 = Point3::new(2.0, 0.5, 0.0);
        assert!(segment_segment_intersect_2d(&a0, &a1, &b0, &b1).is_none());
    }

    #[test]
    fn segment_segment_collinear_overlap() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(4.0, 0.0, 0.0);
        let b0 = Point3::new(1.0, 0.0, 0.0);
        let b1 = Point3::new(6.0, 0.0, 0.0);
        let Some(SegmentIntersection::Collinear { t0, t1 }) =
            segment_segment_intersect_2d(&a0, &a1, &b0, &b1)
        else {
            panic!("expected a collinear overlap");
        };
        assert!((t0 - 0.25).abs() < TOLERANCE);
        assert!((t1 - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn segment_segment_collinear_disjoint_is_none() {
        let a0 = Point3::new(0.0, 0.0, 0.0);
        let a1 = Point3::new(1.0, 0.0, 0.0);
        let b0 = Point3::new(3.0, 0.0, 0.0);
        let b1 = Point3::new(5.0, 0.0, 0.0);
        assert!(segment_segment_intersect_2d(&a0, &a1, &b0, &b1).is_none());
    }
}
