use super::points::Points;
use crate::error::Result;
use crate::math::plane_3d::newell_normal;
use crate::math::polygon_2d::signed_area_2d;
use crate::math::{Point3, Vector3};

/// Caller-owned face token. Copied through every operation, never read.
pub type FaceTag = Option<u32>;

/// A planar polygon with optional hole loops over an owned point pool.
///
/// The outer loop winds counter-clockwise viewed from the positive side of
/// the face normal; holes wind clockwise. All loops index into `pool`.
#[derive(Debug, Clone)]
pub struct PolyArea {
    /// Point pool the loops index into.
    pub pool: Points,
    outer: Vec<usize>,
    holes: Vec<Vec<usize>>,
    /// Token copied onto every face derived from this area.
    pub tag: FaceTag,
}

impl PolyArea {
    /// Creates an area from a pool and its outer loop, with no holes.
    #[must_use]
    pub fn new(pool: Points, outer: Vec<usize>) -> Self {
        Self {
            pool,
            outer,
            holes: Vec::new(),
            tag: None,
        }
    }

    /// Adds a hole loop. The loop must wind clockwise and lie strictly
    /// inside the outer loop.
    pub fn add_hole(&mut self, hole: Vec<usize>) {
        self.holes.push(hole);
    }

    /// The outer loop.
    #[must_use]
    pub fn outer(&self) -> &[usize] {
        &self.outer
    }

    /// The hole loops.
    #[must_use]
    pub fn holes(&self) -> &[Vec<usize>] {
        &self.holes
    }

    /// Iterates all loops, outer first.
    pub fn loops(&self) -> impl Iterator<Item = &[usize]> {
        std::iter::once(self.outer.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }

    /// Resolves a loop's pool indices to coordinates.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::PointOutOfRange` if the loop references a
    /// missing pool entry.
    pub fn loop_coords(&self, ring: &[usize]) -> Result<Vec<Point3>> {
        ring.iter().map(|&i| self.pool.point(i).copied()).collect()
    }

    /// Newell normal of the outer loop.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroVector` if the outer loop is degenerate,
    /// or `ModelError::PointOutOfRange` on a bad index.
    pub fn normal(&self) -> Result<Vector3> {
        newell_normal(&self.loop_coords(&self.outer)?)
    }

    /// Net signed area in the XY plane: the outer loop's area plus the
    /// (negative) areas of the clockwise holes.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::PointOutOfRange` on a bad index.
    pub fn signed_area(&self) -> Result<f64> {
        let mut total = 0.0;
        for ring in self.loops() {
            total += signed_area_2d(&self.loop_coords(ring)?);
        }
        Ok(total)
    }
}
