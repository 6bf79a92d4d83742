use std::collections::HashMap;
use std::f64::consts::PI;

use crate::math::{Point3, TOLERANCE};
use crate::model::Points;

/// Pairs adjacent triangles into convex quads where the merge improves
/// shape quality, passing unmerged triangles through unchanged.
///
/// Triangles are scanned in emission order. For each unpaired triangle the
/// neighbour across a shared edge is chosen that maximises the minimum
/// interior angle of the merged quad; candidates producing a non-convex
/// quad are rejected. Ties go to the lowest neighbour index, so output is
/// deterministic for a given triangle list. Faces in the result keep the
/// scan order and are wound counter-clockwise like their sources.
#[must_use]
pub fn quadrangulate(points: &Points, triangles: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let n = triangles.len();
    let coords = points.coords();

    // Undirected edge -> list of (triangle, slot) that traverse it. A slot
    // is the position of the edge's first vertex in the triangle.
    let mut edge_map: HashMap<(usize, usize), Vec<(usize, usize)>> = HashMap::new();
    for (t, tri) in triangles.iter().enumerate() {
        for slot in 0..3 {
            let a = tri[slot];
            let b = tri[(slot + 1) % 3];
            edge_map.entry(edge_key(a, b)).or_default().push((t, slot));
        }
    }

    let mut merged = vec![false; n];
    let mut quads: Vec<Option<[usize; 4]>> = vec![None; n];

    for (ti, tri) in triangles.iter().enumerate() {
        if merged[ti] {
            continue;
        }
        let mut candidates: Vec<(usize, [usize; 4])> = Vec::new();
        for slot in 0..3 {
            let s0 = tri[slot];
            let s1 = tri[(slot + 1) % 3];
            let r = tri[(slot + 2) % 3];
            let Some(entries) = edge_map.get(&edge_key(s0, s1)) else {
                continue;
            };
            for &(tj, jslot) in entries {
                if tj == ti || merged[tj] {
                    continue;
                }
                let o = triangles[tj][(jslot + 2) % 3];
                // Walking s0 -> o -> s1 crosses the neighbour, s1 -> r -> s0
                // closes through this triangle, so winding is preserved.
                candidates.push((tj, [s0, o, s1, r]));
            }
        }
        candidates.sort_by_key(|&(tj, _)| tj);

        let mut best: Option<(f64, usize, [usize; 4])> = None;
        for (tj, quad) in candidates {
            let Some(score) = min_interior_angle(coords, &quad) else {
                continue;
            };
            if best.is_none_or(|(b, _, _)| score > b) {
                best = Some((score, tj, quad));
            }
        }
        if let Some((_, tj, quad)) = best {
            merged[ti] = true;
            merged[tj] = true;
            quads[ti] = Some(quad);
        }
    }

    let mut faces = Vec::new();
    for ti in 0..n {
        if let Some(quad) = quads[ti] {
            faces.push(quad.to_vec());
        } else if !merged[ti] {
            faces.push(triangles[ti].to_vec());
        }
    }
    faces
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Minimum interior angle of the quad, or `None` if any corner fails to
/// turn strictly counter-clockwise.
fn min_interior_angle(coords: &[Point3], quad: &[usize; 4]) -> Option<f64> {
    let mut min_angle = f64::INFINITY;
    for i in 0..4 {
        let a = &coords[quad[(i + 3) % 4]];
        let b = &coords[quad[i]];
        let c = &coords[quad[(i + 1) % 4]];
        let (in_x, in_y) = (b.x - a.x, b.y - a.y);
        let (out_x, out_y) = (c.x - b.x, c.y - b.y);
        let cross = in_x * out_y - in_y * out_x;
        if cross <= TOLERANCE {
            return None;
        }
        let dot = in_x * out_x + in_y * out_y;
        min_angle = min_angle.min(PI - cross.atan2(dot));
    }
    Some(min_angle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::polygon_2d::signed_area_2d;

    fn pool_with(points: &[(f64, f64)]) -> Points {
        let mut pool = Points::new();
        for &(x, y) in points {
            pool.add(Point3::new(x, y, 0.0));
        }
        pool
    }

    fn face_area(pool: &Points, face: &[usize]) -> f64 {
        let pts: Vec<Point3> = face.iter().map(|&i| *pool.point(i).unwrap()).collect();
        signed_area_2d(&pts)
    }

    #[test]
    fn square_halves_merge_back_into_the_square() {
        let pool = pool_with(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let faces = quadrangulate(&pool, &[[3, 0, 1], [3, 1, 2]]);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].len(), 4);
        let mut sorted = faces[0].clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert!((face_area(&pool, &faces[0]) - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn non_convex_union_stays_two_triangles() {
        // Merging across the shared edge would put a reflex corner at the
        // shallow vertex (1, 0.2).
        let pool = pool_with(&[(0.0, 0.0), (2.0, 0.0), (1.0, 0.2), (1.0, 1.0)]);
        let faces = quadrangulate(&pool, &[[0, 1, 2], [0, 2, 3]]);
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(|f| f.len() == 3));
    }

    #[test]
    fn two_squares_merge_pairwise() {
        let pool = pool_with(&[
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 1.0),
            (2.0, 0.0),
            (2.0, 1.0),
        ]);
        let tris = [[3, 0, 1], [3, 1, 2], [2, 1, 4], [2, 4, 5]];
        let faces = quadrangulate(&pool, &tris);
        assert_eq!(faces.len(), 2);
        let mut total = 0.0;
        for face in &faces {
            assert_eq!(face.len(), 4);
            let a = face_area(&pool, face);
            assert!((a - 1.0).abs() < TOLERANCE, "quad area {a}");
            total += a;
        }
        assert!((total - 2.0).abs() < TOLERANCE);
    }

    #[test]
    fn lone_triangle_passes_through() {
        let pool = pool_with(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let faces = quadrangulate(&pool, &[[0, 1, 2]]);
        assert_eq!(faces, vec![vec![0, 1, 2]]);
    }
}
