use std::cmp::Ordering;

use tracing::debug;

use crate::error::{Result, TessellationError};
use crate::math::intersect_2d::segment_segment_intersect_2d;
use crate::math::polygon_2d::{point_in_polygon, PointLocation};
use crate::math::{Point3, TOLERANCE};
use crate::model::{Points, PolyArea};

/// Triangulates a polygon with holes into counter-clockwise triangles.
///
/// Holes are first folded into the outer loop through bridge diagonals
/// (each bridge is a pair of coincident, opposite edges), then the unified
/// loop is ear-clipped. Runs in the XY plane; z coordinates ride along
/// through the pool indices. Triangles index into `area.pool`.
///
/// # Errors
///
/// - `TessellationError::DegenerateLoop` if the outer loop has fewer than
///   three vertices.
/// - `TessellationError::NoBridge` if a hole cannot see the outer boundary.
/// - `TessellationError::NoEar` if clipping gets stuck; callers usually fall
///   back to emitting the plain outer loop.
pub fn triangulate_face(area: &PolyArea) -> Result<Vec<[usize; 3]>> {
    if area.outer().len() < 3 {
        return Err(TessellationError::DegenerateLoop(format!(
            "outer loop has {} vertices",
            area.outer().len()
        ))
        .into());
    }
    let unified = unify_holes(area)?;
    clip_ears(&unified, &area.pool)
}

// ── phase A: hole unification ──

/// Folds every hole into the outer loop via bridge diagonals, producing one
/// closed loop that traces the outer boundary and detours around each hole.
fn unify_holes(area: &PolyArea) -> Result<Vec<usize>> {
    let mut unified: Vec<usize> = area.outer().to_vec();
    if area.holes().is_empty() {
        return Ok(unified);
    }

    // Bridge outermost holes first: descending rightmost-vertex x.
    let mut hole_max_x = Vec::with_capacity(area.holes().len());
    for hole in area.holes() {
        let coords = area.loop_coords(hole)?;
        let max_x = coords.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        hole_max_x.push(max_x);
    }
    let mut order: Vec<usize> = (0..area.holes().len()).collect();
    order.sort_by(|&a, &b| {
        hole_max_x[b]
            .partial_cmp(&hole_max_x[a])
            .unwrap_or(Ordering::Equal)
    });

    for (placed, &h) in order.iter().enumerate() {
        let hole = &area.holes()[h];
        if hole.len() < 3 {
            debug!(hole = h, len = hole.len(), "skipping degenerate hole loop");
            continue;
        }
        let pending = &order[placed + 1..];
        let (o_pos, h_pos) = find_bridge(area, &unified, h, pending)?;

        // Splice the hole in with both bridge endpoints duplicated, forming
        // two coincident opposite edges.
        let mut next = Vec::with_capacity(unified.len() + hole.len() + 2);
        next.extend_from_slice(&unified[..=o_pos]);
        for i in 0..hole.len() {
            next.push(hole[(h_pos + i) % hole.len()]);
        }
        next.push(hole[h_pos]);
        next.push(unified[o_pos]);
        next.extend_from_slice(&unified[o_pos + 1..]);
        unified = next;
    }
    Ok(unified)
}

/// Picks the bridge anchor pair for hole `h` against the current unified
/// loop: the mutually visible pair with the smallest x-distance, breaking
/// ties by y-distance, then hole vertex index, then loop position.
fn find_bridge(
    area: &PolyArea,
    unified: &[usize],
    h: usize,
    pending: &[usize],
) -> Result<(usize, usize)> {
    let hole = &area.holes()[h];
    let unified_pts = area.loop_coords(unified)?;
    let hole_pts = area.loop_coords(hole)?;

    // Every edge that may block a candidate diagonal: the unified loop, the
    // hole itself, and all holes not yet bridged.
    let mut blockers: Vec<Vec<Point3>> = vec![unified_pts.clone(), hole_pts.clone()];
    for &other in pending {
        blockers.push(area.loop_coords(&area.holes()[other])?);
    }

    let mut best: Option<(f64, f64, usize, usize)> = None;
    for (h_pos, hp) in hole_pts.iter().enumerate() {
        for (o_pos, op) in unified_pts.iter().enumerate() {
            let key = ((op.x - hp.x).abs(), (op.y - hp.y).abs(), h_pos, o_pos);
            if let Some(b) = best {
                if key >= b {
                    continue;
                }
            }
            if diagonal_is_clear(op, hp, &blockers, o_pos, h_pos) {
                best = Some(key);
            }
        }
    }
    match best {
        Some((_, _, h_pos, o_pos)) => Ok((o_pos, h_pos)),
        None => Err(TessellationError::NoBridge(h).into()),
    }
}

/// Whether the open segment `o`-`h` crosses none of the blocking rings.
/// Ring 0 is the unified loop (edges incident to `o_pos` exempt), ring 1 the
/// hole being bridged (edges incident to `h_pos` exempt).
fn diagonal_is_clear(
    o: &Point3,
    h: &Point3,
    blockers: &[Vec<Point3>],
    o_pos: usize,
    h_pos: usize,
) -> bool {
    for (ring_no, ring) in blockers.iter().enumerate() {
        let n = ring.len();
        for i in 0..n {
            let j = (i + 1) % n;
            let incident = match ring_no {
                0 => i == o_pos || j == o_pos,
                1 => i == h_pos || j == h_pos,
                _ => false,
            };
            if incident {
                continue;
            }
            if segment_segment_intersect_2d(o, h, &ring[i], &ring[j]).is_some() {
                return false;
            }
        }
    }
    true
}

// ── phase B: ear clipping ──

/// Doubly linked vertex loop over the unified boundary.
struct EarLoop {
    pool_idx: Vec<usize>,
    pts: Vec<Point3>,
    prev: Vec<usize>,
    next: Vec<usize>,
    alive: Vec<bool>,
    ear: Vec<bool>,
    remaining: usize,
}

impl EarLoop {
    fn new(loop_indices: &[usize], pool: &Points) -> Result<Self> {
        let n = loop_indices.len();
        let mut pts = Vec::with_capacity(n);
        for &idx in loop_indices {
            pts.push(*pool.point(idx)?);
        }
        Ok(Self {
            pool_idx: loop_indices.to_vec(),
            pts,
            prev: (0..n).map(|i| (i + n - 1) % n).collect(),
            next: (0..n).map(|i| (i + 1) % n).collect(),
            alive: vec![true; n],
            ear: vec![false; n],
            remaining: n,
        })
    }

    /// Twice the signed area of the corner triangle at `v`.
    fn corner_cross(&self, v: usize) -> f64 {
        let (u, w) = (self.prev[v], self.next[v]);
        let (a, b, c) = (&self.pts[u], &self.pts[v], &self.pts[w]);
        (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x)
    }

    fn remove(&mut self, v: usize) {
        let (u, w) = (self.prev[v], self.next[v]);
        self.next[u] = w;
        self.prev[w] = u;
        self.alive[v] = false;
        self.ear[v] = false;
        self.remaining -= 1;
    }

    /// Blocker membership: strictly inside the corner triangle at `v`,
    /// ignoring vertices that share a pool point with a corner (bridge
    /// duplicates).
    fn blocks(&self, j: usize, v: usize) -> bool {
        let (u, w) = (self.prev[v], self.next[v]);
        if j == u || j == v || j == w {
            return false;
        }
        let pj = self.pool_idx[j];
        if pj == self.pool_idx[u] || pj == self.pool_idx[v] || pj == self.pool_idx[w] {
            return false;
        }
        let (a, b, c) = (&self.pts[u], &self.pts[v], &self.pts[w]);
        let p = &self.pts[j];
        let c1 = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let c2 = (c.x - b.x) * (p.y - b.y) - (c.y - b.y) * (p.x - b.x);
        let c3 = (a.x - c.x) * (p.y - c.y) - (a.y - c.y) * (p.x - c.x);
        c1 > TOLERANCE && c2 > TOLERANCE && c3 > TOLERANCE
    }

    fn is_ear(&self, v: usize) -> bool {
        let (u, w) = (self.prev[v], self.next[v]);
        // A corner whose flanks are the two sides of a bridge closes back on
        // itself and is never clippable.
        if self.pool_idx[u] == self.pool_idx[w] {
            return false;
        }
        if self.corner_cross(v) <= TOLERANCE {
            return false;
        }
        (0..self.pts.len()).all(|j| !self.alive[j] || !self.blocks(j, v))
    }

    /// Removes corners spanning less than tolerance area, cascading into the
    /// neighbours they expose. Consumed bridges unwind through here. Every
    /// removal is recorded as `(gone, ex_prev, ex_next)` for the refresh.
    fn drop_flat_corners(&mut self, removals: &mut Vec<(usize, usize, usize)>) {
        let mut dirty: Vec<usize> = (0..self.pts.len()).filter(|&i| self.alive[i]).collect();
        while let Some(v) = dirty.pop() {
            if !self.alive[v] || self.remaining < 3 {
                continue;
            }
            if self.corner_cross(v).abs() < TOLERANCE {
                let (u, w) = (self.prev[v], self.next[v]);
                self.remove(v);
                removals.push((v, u, w));
                dirty.push(u);
                dirty.push(w);
            }
        }
    }

    /// Re-derives ear status after removals: ex-neighbours changed shape,
    /// and any corner a removed vertex was blocking may have opened up.
    fn refresh(&mut self, removals: &[(usize, usize, usize)]) {
        let n = self.pts.len();
        let mut retest = vec![false; n];
        for &(gone, u, w) in removals {
            if self.alive[u] {
                retest[u] = true;
            }
            if self.alive[w] {
                retest[w] = true;
            }
            for j in 0..n {
                if self.alive[j] && !self.ear[j] && !retest[j] && self.point_in_corner(gone, j) {
                    retest[j] = true;
                }
            }
        }
        for j in 0..n {
            if retest[j] {
                self.ear[j] = self.is_ear(j);
            }
        }
    }

    /// Whether the (possibly dead) vertex `g` sits inside the corner
    /// triangle at `v`. Used to find ears a removed blocker has released.
    fn point_in_corner(&self, g: usize, v: usize) -> bool {
        let (u, w) = (self.prev[v], self.next[v]);
        let (a, b, c) = (&self.pts[u], &self.pts[v], &self.pts[w]);
        let p = &self.pts[g];
        let c1 = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let c2 = (c.x - b.x) * (p.y - b.y) - (c.y - b.y) * (p.x - b.x);
        let c3 = (a.x - c.x) * (p.y - c.y) - (a.y - c.y) * (p.x - c.x);
        c1 > -TOLERANCE && c2 > -TOLERANCE && c3 > -TOLERANCE
    }
}

/// Ear-clips a closed CCW loop of pool indices into triangles.
///
/// Each round clips the smallest-area ear (ties to the lowest loop
/// position), which keeps slivers from propagating across the face.
fn clip_ears(loop_indices: &[usize], pool: &Points) -> Result<Vec<[usize; 3]>> {
    let mut ring = EarLoop::new(loop_indices, pool)?;
    let mut triangles = Vec::with_capacity(loop_indices.len().saturating_sub(2));

    ring.drop_flat_corners(&mut Vec::new());
    for v in 0..ring.pts.len() {
        if ring.alive[v] {
            ring.ear[v] = ring.is_ear(v);
        }
    }

    while ring.remaining > 3 {
        let mut chosen: Option<(f64, usize)> = None;
        for v in 0..ring.pts.len() {
            if !ring.alive[v] || !ring.ear[v] {
                continue;
            }
            let area = ring.corner_cross(v) * 0.5;
            if chosen.is_none_or(|(best, _)| area < best) {
                chosen = Some((area, v));
            }
        }
        let Some((_, v)) = chosen else {
            return Err(TessellationError::NoEar {
                remaining: ring.remaining,
            }
            .into());
        };
        let (u, w) = (ring.prev[v], ring.next[v]);
        triangles.push([ring.pool_idx[u], ring.pool_idx[v], ring.pool_idx[w]]);
        ring.remove(v);
        let mut removals = vec![(v, u, w)];
        ring.drop_flat_corners(&mut removals);
        if ring.remaining < 3 {
            break;
        }
        ring.refresh(&removals);
    }

    if ring.remaining == 3 {
        if let Some(v) = (0..ring.pts.len()).find(|&i| ring.alive[i]) {
            if ring.corner_cross(v) > TOLERANCE {
                let (u, w) = (ring.prev[v], ring.next[v]);
                triangles.push([ring.pool_idx[u], ring.pool_idx[v], ring.pool_idx[w]]);
            }
        }
    }

    Ok(triangles)
}

/// Whether `p` lies inside the area's outer loop and outside all holes.
///
/// # Errors
///
/// Returns `ModelError::PointOutOfRange` if a loop references a missing
/// pool entry.
pub fn point_in_area(p: &Point3, area: &PolyArea) -> Result<bool> {
    let outer = area.loop_coords(area.outer())?;
    if point_in_polygon(p, &outer) != PointLocation::Inside {
        return Ok(false);
    }
    for hole in area.holes() {
        let ring = area.loop_coords(hole)?;
        if point_in_polygon(p, &ring) != PointLocation::Outside {
            return Ok(false);
        }
    }
    Ok(true)
}
