mod event;
mod spoke;
mod wavefront;

pub use spoke::Spoke;

use std::f64::consts::FRAC_PI_2;

use slotmap::{new_key_type, SlotMap};

use crate::error::{GeometryError, OffsetError, Result};
use crate::math::TOLERANCE;
use crate::model::{Points, PolyArea};

use wavefront::Wavefront;

new_key_type! {
    /// Handle to one node of an [`OffsetTree`].
    pub struct OffsetNodeId;
}

/// One generation of the sweep: a set of rings that advanced together
/// between two topology changes.
#[derive(Debug, Clone)]
pub struct OffsetNode {
    /// Depth at which this node's rings started moving.
    pub time: f64,
    /// Depth at which they stopped, at an event or at the target.
    pub end_time: f64,
    /// The rings, one spoke per vertex, outer first.
    pub rings: Vec<Vec<Spoke>>,
    /// Nodes spawned when this one closed.
    pub children: Vec<OffsetNodeId>,
}

/// History of a sweep, rooted at the input area's generation.
#[derive(Debug, Clone)]
pub struct OffsetTree {
    nodes: SlotMap<OffsetNodeId, OffsetNode>,
    root: OffsetNodeId,
}

impl OffsetTree {
    fn with_root(node: OffsetNode) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(node);
        Self { nodes, root }
    }

    fn insert(&mut self, node: OffsetNode) -> OffsetNodeId {
        self.nodes.insert(node)
    }

    fn get_mut(&mut self, id: OffsetNodeId) -> Option<&mut OffsetNode> {
        self.nodes.get_mut(id)
    }

    /// The input area's generation.
    #[must_use]
    pub fn root(&self) -> OffsetNodeId {
        self.root
    }

    /// Looks up one generation.
    #[must_use]
    pub fn node(&self, id: OffsetNodeId) -> Option<&OffsetNode> {
        self.nodes.get(id)
    }

    /// Number of generations recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over all generations in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (OffsetNodeId, &OffsetNode)> {
        self.nodes.iter()
    }
}

/// Everything produced by one offset run.
///
/// All face and ring entries index into `points`.
#[derive(Debug, Clone)]
pub struct OffsetResult {
    /// The input pool extended with every vertex the sweep minted.
    pub points: Points,
    /// Lateral faces swept by the boundary, one per advanced edge.
    pub side_walls: Vec<Vec<usize>>,
    /// What remains of the area at the final depth; empty on full collapse.
    pub inner_polyareas: Vec<PolyArea>,
    /// Depth the sweep actually reached.
    pub end_time: f64,
    /// Depth at which some region first vanished, if one did.
    pub first_collapse: Option<f64>,
    /// The sweep's generation tree.
    pub tree: OffsetTree,
}

/// Offsets a planar area inward by a fixed distance.
///
/// The area lives in the XY plane. A nonzero `pitch` tilts the sweep so
/// every point climbs in z by `tan(pitch)` per unit of advance, turning
/// the side walls into sloped faces.
#[derive(Debug, Clone)]
pub struct OffsetEngine {
    area: PolyArea,
    pitch: f64,
    distance: f64,
}

impl OffsetEngine {
    /// # Errors
    ///
    /// Returns `GeometryError::ParameterOutOfRange` when `pitch` falls
    /// outside `[0, pi/2)` or `distance` is not a positive finite value.
    pub fn new(area: PolyArea, pitch: f64, distance: f64) -> Result<Self> {
        if !pitch.is_finite() || pitch < 0.0 || pitch >= FRAC_PI_2 {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "pitch",
                value: pitch,
                min: 0.0,
                max: FRAC_PI_2,
            }
            .into());
        }
        if !distance.is_finite() || distance <= TOLERANCE {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "distance",
                value: distance,
                min: TOLERANCE,
                max: f64::INFINITY,
            }
            .into());
        }
        Ok(Self {
            area,
            pitch,
            distance,
        })
    }

    /// Runs the sweep to the target depth.
    ///
    /// # Errors
    ///
    /// Returns `OffsetError::DegenerateArea` for an input without interior,
    /// `OffsetError::IterationLimit` if the event budget runs out, or a
    /// `ModelError` if a ring references a missing pool entry.
    pub fn execute(self) -> Result<OffsetResult> {
        let mut wavefront = Wavefront::new(self.area, self.pitch, self.distance)?;
        while wavefront.advance()? {}
        wavefront.finish()
    }

    /// Depth at which the area first loses a region, independent of the
    /// configured distance. Runs the sweep dry until something collapses.
    ///
    /// # Errors
    ///
    /// The `execute` errors, plus `OffsetError::Stalled` if the event queue
    /// drains with the area still alive.
    pub fn collapse_time(&self) -> Result<f64> {
        let mut wavefront = Wavefront::new(self.area.clone(), 0.0, f64::INFINITY)?;
        while wavefront.first_collapse().is_none() {
            if !wavefront.advance()? {
                break;
            }
        }
        wavefront
            .first_collapse()
            .ok_or_else(|| OffsetError::Stalled.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_4;

    use super::*;
    use crate::error::BevelisError;
    use crate::math::polygon_2d::rotate_to_canonical_start;
    use crate::math::Point3;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn area_from(outer: &[(f64, f64)], holes: &[&[(f64, f64)]]) -> PolyArea {
        let mut pool = Points::new();
        let ring: Vec<usize> = outer.iter().map(|&(x, y)| pool.add(p(x, y))).collect();
        let hole_rings: Vec<Vec<usize>> = holes
            .iter()
            .map(|h| h.iter().map(|&(x, y)| pool.add(p(x, y))).collect())
            .collect();
        let mut area = PolyArea::new(pool, ring);
        for hole in hole_rings {
            area.add_hole(hole);
        }
        area
    }

    fn unit_square() -> PolyArea {
        area_from(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], &[])
    }

    fn annulus() -> PolyArea {
        area_from(
            &[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)],
            &[&[(0.3, 0.3), (0.3, 0.7), (0.7, 0.7), (0.7, 0.3)]],
        )
    }

    fn chevron() -> PolyArea {
        area_from(
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 3.0), (2.0, 1.0), (0.0, 3.0)],
            &[],
        )
    }

    fn perimeter(area: &PolyArea) -> f64 {
        let mut total = 0.0;
        for ring in area.loops() {
            let coords = area.loop_coords(ring).unwrap();
            let n = coords.len();
            for i in 0..n {
                let (a, b) = (&coords[i], &coords[(i + 1) % n]);
                total += ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt();
            }
        }
        total
    }

    #[test]
    fn quarter_inset_keeps_a_square_residual() {
        let result = OffsetEngine::new(unit_square(), 0.0, 0.25)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.side_walls.len(), 4);
        assert!(result.side_walls.iter().all(|w| w.len() == 4));
        assert_eq!(result.inner_polyareas.len(), 1);
        assert!((result.end_time - 0.25).abs() < TOLERANCE);
        assert!(result.first_collapse.is_none());
        assert_eq!(result.tree.len(), 1);

        let residual = &result.inner_polyareas[0];
        assert!(residual.holes().is_empty());
        let coords =
            rotate_to_canonical_start(&residual.loop_coords(residual.outer()).unwrap());
        let expected = [(0.25, 0.25), (0.75, 0.25), (0.75, 0.75), (0.25, 0.75)];
        assert_eq!(coords.len(), expected.len());
        for (pt, &(x, y)) in coords.iter().zip(expected.iter()) {
            assert!((pt.x - x).abs() < TOLERANCE);
            assert!((pt.y - y).abs() < TOLERANCE);
            assert!(pt.z.abs() < TOLERANCE);
        }
    }

    #[test]
    fn half_inset_collapses_to_the_centre() {
        let result = OffsetEngine::new(unit_square(), 0.0, 0.5)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.side_walls.len(), 4);
        assert!(result.side_walls.iter().all(|w| w.len() == 3));
        assert!(result.inner_polyareas.is_empty());
        assert!((result.end_time - 0.5).abs() < TOLERANCE);
        assert!((result.first_collapse.unwrap() - 0.5).abs() < TOLERANCE);

        let root = result.tree.node(result.tree.root()).unwrap();
        assert!(root.children.is_empty());
        for spoke in &root.rings[0] {
            assert!((spoke.dest.x - 0.5).abs() < TOLERANCE);
            assert!((spoke.dest.y - 0.5).abs() < TOLERANCE);
        }
    }

    #[test]
    fn pitch_lifts_the_residual() {
        let result = OffsetEngine::new(unit_square(), FRAC_PI_4, 0.25)
            .unwrap()
            .execute()
            .unwrap();

        let residual = &result.inner_polyareas[0];
        for pt in residual.loop_coords(residual.outer()).unwrap() {
            assert!((pt.z - 0.25).abs() < TOLERANCE);
        }
    }

    #[test]
    fn annulus_inset_keeps_the_hole() {
        let result = OffsetEngine::new(annulus(), 0.0, 0.1)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.side_walls.len(), 8);
        assert_eq!(result.inner_polyareas.len(), 1);
        assert!(result.first_collapse.is_none());

        let residual = &result.inner_polyareas[0];
        assert_eq!(residual.holes().len(), 1);
        let net = residual.signed_area().unwrap();
        assert!((net - 0.28).abs() < 10.0 * TOLERANCE);
    }

    #[test]
    fn collapse_time_finds_the_thinnest_gap() {
        let square = OffsetEngine::new(unit_square(), 0.0, 0.1).unwrap();
        assert!((square.collapse_time().unwrap() - 0.5).abs() < TOLERANCE);

        let ring = OffsetEngine::new(annulus(), 0.0, 0.1).unwrap();
        assert!((ring.collapse_time().unwrap() - 0.15).abs() < TOLERANCE);
    }

    #[test]
    fn notch_split_produces_two_regions() {
        let input = chevron();
        let before = perimeter(&input);

        let result = OffsetEngine::new(input, 0.0, 0.5)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.inner_polyareas.len(), 2);
        assert_eq!(result.tree.len(), 3);
        assert!(result.first_collapse.is_none());
        assert!((result.end_time - 0.5).abs() < TOLERANCE);

        let root = result.tree.node(result.tree.root()).unwrap();
        assert_eq!(root.children.len(), 2);

        let mut after = 0.0;
        for residual in &result.inner_polyareas {
            assert!(residual.holes().is_empty());
            assert!(residual.signed_area().unwrap() > TOLERANCE);
            after += perimeter(residual);
        }
        assert!(after < before);
    }

    #[test]
    fn hole_bridge_collapse_splits_the_area() {
        let input = area_from(
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 1.0), (0.0, 1.0)],
            &[&[(0.8, 0.3), (0.8, 0.7), (1.2, 0.7), (1.2, 0.3)]],
        );
        let result = OffsetEngine::new(input, 0.0, 0.2)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.inner_polyareas.len(), 2);
        assert!((result.first_collapse.unwrap() - 0.15).abs() < TOLERANCE);

        let mut areas: Vec<f64> = result
            .inner_polyareas
            .iter()
            .map(|pa| pa.signed_area().unwrap())
            .collect();
        areas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        assert!((areas[0] - 0.24).abs() < 0.01);
        assert!((areas[1] - 1.44).abs() < 0.01);
        for residual in &result.inner_polyareas {
            assert!(residual.holes().is_empty());
        }
    }

    #[test]
    fn chamfer_corner_merges_and_keeps_the_hole() {
        let input = area_from(
            &[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.5, 4.0), (0.0, 3.5)],
            &[&[(1.8, 1.8), (1.8, 2.2), (2.2, 2.2), (2.2, 1.8)]],
        );
        let result = OffsetEngine::new(input, 0.0, 0.88)
            .unwrap()
            .execute()
            .unwrap();

        assert_eq!(result.inner_polyareas.len(), 1);
        assert_eq!(result.tree.len(), 2);
        assert!(result.first_collapse.is_none());

        let root = result.tree.node(result.tree.root()).unwrap();
        assert_eq!(root.children.len(), 1);

        let residual = &result.inner_polyareas[0];
        assert_eq!(residual.holes().len(), 1);
        let net = residual.signed_area().unwrap();
        assert!((net - 0.352).abs() < 0.01);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(OffsetEngine::new(unit_square(), -0.1, 0.25).is_err());
        assert!(OffsetEngine::new(unit_square(), FRAC_PI_2, 0.25).is_err());
        assert!(OffsetEngine::new(unit_square(), 0.0, 0.0).is_err());
    }

    #[test]
    fn rejects_a_collinear_ring() {
        let flat = area_from(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)], &[]);
        let err = OffsetEngine::new(flat, 0.0, 0.1)
            .unwrap()
            .execute()
            .unwrap_err();
        assert!(matches!(
            err,
            BevelisError::Offset(OffsetError::DegenerateArea)
        ));
    }
}
