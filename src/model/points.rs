use std::collections::HashMap;

use crate::error::{ModelError, Result};
use crate::math::{Point2, Point3, ROUND_PLACES};

/// Append-only point pool that merges coincident positions.
///
/// Coordinates are rounded to [`ROUND_PLACES`] decimal places on insertion
/// and the rounded triple is the identity key, so two positions closer than
/// the rounding granularity share one index. Indices are dense and stable;
/// points are never removed.
#[derive(Debug, Clone, Default)]
pub struct Points {
    coords: Vec<Point3>,
    index: HashMap<[i64; 3], usize>,
}

impl Points {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn quantize(v: f64) -> i64 {
        (v * 10f64.powi(ROUND_PLACES)).round() as i64
    }

    #[allow(clippy::cast_precision_loss)]
    fn unquantize(q: i64) -> f64 {
        q as f64 / 10f64.powi(ROUND_PLACES)
    }

    /// Inserts a point, returning the index of the pool entry it rounds to.
    ///
    /// Re-inserting any position within rounding distance of an existing
    /// entry returns that entry's index and leaves the pool unchanged.
    pub fn add(&mut self, p: Point3) -> usize {
        let key = [
            Self::quantize(p.x),
            Self::quantize(p.y),
            Self::quantize(p.z),
        ];
        if let Some(&existing) = self.index.get(&key) {
            return existing;
        }
        let idx = self.coords.len();
        self.coords.push(Point3::new(
            Self::unquantize(key[0]),
            Self::unquantize(key[1]),
            Self::unquantize(key[2]),
        ));
        self.index.insert(key, idx);
        idx
    }

    /// Inserts a 2D point at z = 0.
    pub fn add_2d(&mut self, p: Point2) -> usize {
        self.add(Point3::new(p.x, p.y, 0.0))
    }

    /// Returns the stored (rounded) coordinates of a pool entry.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::PointOutOfRange` if the index does not exist.
    pub fn point(&self, index: usize) -> Result<&Point3> {
        self.coords.get(index).ok_or_else(|| {
            ModelError::PointOutOfRange {
                index,
                len: self.coords.len(),
            }
            .into()
        })
    }

    /// Number of distinct points in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Whether the pool holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// All stored coordinates, indexed by pool index.
    #[must_use]
    pub fn coords(&self) -> &[Point3] {
        &self.coords
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::TOLERANCE;

    #[test]
    fn add_is_idempotent() {
        let mut pool = Points::new();
        let a = pool.add(Point3::new(1.0, 2.0, 3.0));
        let b = pool.add(Point3::new(1.0, 2.0, 3.0));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn add_merges_within_rounding_distance() {
        let mut pool = Points::new();
        let a = pool.add(Point3::new(0.5, 0.5, 0.0));
        let b = pool.add(Point3::new(0.500_04, 0.499_96, 0.0));
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn add_keeps_distinct_points_apart() {
        let mut pool = Points::new();
        let a = pool.add(Point3::new(0.0, 0.0, 0.0));
        let b = pool.add(Point3::new(0.001, 0.0, 0.0));
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn stored_coordinates_are_rounded() {
        let mut pool = Points::new();
        let idx = pool.add(Point3::new(0.123_456, -0.000_04, 2.0));
        let p = pool.point(idx).unwrap();
        assert!((p.x - 0.1235).abs() < 1e-12);
        assert!(p.y.abs() < 1e-12);
        assert!((p.z - 2.0).abs() < 1e-12);
    }

    #[test]
    fn add_2d_stores_zero_z() {
        let mut pool = Points::new();
        let idx = pool.add_2d(Point2::new(1.5, -2.5));
        let p = pool.point(idx).unwrap();
        assert!((p.x - 1.5).abs() < TOLERANCE);
        assert!((p.y + 2.5).abs() < TOLERANCE);
        assert!(p.z.abs() < TOLERANCE);
    }

    #[test]
    fn point_out_of_range_errors() {
        let pool = Points::new();
        assert!(pool.point(0).is_err());
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        let mut pool = Points::new();
        for (expected, x) in [0.0, 1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            let idx = pool.add(Point3::new(x, 0.0, 0.0));
            assert_eq!(idx, expected);
        }
        assert_eq!(pool.coords().len(), 5);
    }
}
