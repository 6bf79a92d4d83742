use std::collections::HashMap;

use tracing::warn;

use crate::error::Result;
use crate::math::plane_3d::{newell_normal, PlaneBasis};
use crate::math::polygon_2d::{point_in_polygon, PointLocation};
use crate::math::{Point3, TOLERANCE};
use crate::model::{FaceTag, Model};

/// One planar region assembled from selected faces.
///
/// Loop entries index into the model's point pool. The outer loop keeps
/// the winding of the faces it came from, so consistently counter-clockwise
/// faces produce a counter-clockwise outer and clockwise holes.
#[derive(Debug, Clone)]
pub struct Region {
    /// Boundary loop enclosing the region.
    pub outer: Vec<usize>,
    /// Inner loops contained in the outer one.
    pub holes: Vec<Vec<usize>>,
    /// Tag inherited from the region's first face.
    pub tag: FaceTag,
}

/// Fuses selected faces into planar regions.
///
/// Two faces are adjacent when they share an edge traversed in opposite
/// directions; each connected component of that graph becomes one region.
/// The region boundary consists of the edges used by exactly one member
/// face, threaded into closed loops by following end vertices (the
/// earliest-collected edge wins where more than one continues a chain).
///
/// # Errors
///
/// Returns `ModelError::FaceOutOfRange` when a selected face does not
/// exist, or `ModelError::PointOutOfRange` when one references a missing
/// pool entry.
pub fn detect_regions(model: &Model, selected: &[usize]) -> Result<Vec<Region>> {
    let mut faces: Vec<&[usize]> = Vec::with_capacity(selected.len());
    let mut tags: Vec<FaceTag> = Vec::with_capacity(selected.len());
    for &index in selected {
        faces.push(model.face(index)?);
        tags.push(model.face_tag(index)?);
    }

    let adjacency = face_adjacency(&faces);
    let components = connected_components(&adjacency);
    let count = components.iter().copied().max().map_or(0, |m| m + 1);

    let mut regions = Vec::new();
    for comp in 0..count {
        let members: Vec<usize> = (0..faces.len())
            .filter(|&f| components[f] == comp)
            .collect();
        let loops = boundary_loops(&faces, &members);
        let Some((outer, holes)) = classify_loops(model, loops)? else {
            warn!(component = comp, "selected faces yield no closed boundary");
            continue;
        };
        regions.push(Region {
            outer,
            holes,
            tag: tags[members[0]],
        });
    }
    Ok(regions)
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Directed edges of a face, skipping degenerate self-loops.
fn face_edges(face: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
    let n = face.len();
    (0..n).filter_map(move |i| {
        let (a, b) = (face[i], face[(i + 1) % n]);
        (a != b).then_some((a, b))
    })
}

fn face_adjacency(faces: &[&[usize]]) -> Vec<Vec<usize>> {
    let mut edge_users: HashMap<(usize, usize), Vec<(usize, bool)>> = HashMap::new();
    for (fi, face) in faces.iter().enumerate() {
        for (a, b) in face_edges(face) {
            edge_users.entry(edge_key(a, b)).or_default().push((fi, a < b));
        }
    }

    let mut adjacency = vec![Vec::new(); faces.len()];
    for users in edge_users.values() {
        for (i, &(fa, da)) in users.iter().enumerate() {
            for &(fb, db) in &users[i + 1..] {
                if da != db {
                    adjacency[fa].push(fb);
                    adjacency[fb].push(fa);
                }
            }
        }
    }
    adjacency
}

fn connected_components(adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut component = vec![usize::MAX; adjacency.len()];
    let mut next = 0;
    for start in 0..adjacency.len() {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = next;
        let mut stack = vec![start];
        while let Some(f) = stack.pop() {
            for &g in &adjacency[f] {
                if component[g] == usize::MAX {
                    component[g] = next;
                    stack.push(g);
                }
            }
        }
        next += 1;
    }
    component
}

/// Collects the component's boundary edges (undirected use count one) and
/// threads them into closed loops. Open chains are dropped with a warning.
fn boundary_loops(faces: &[&[usize]], members: &[usize]) -> Vec<Vec<usize>> {
    let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
    for &f in members {
        for (a, b) in face_edges(faces[f]) {
            *counts.entry(edge_key(a, b)).or_insert(0) += 1;
        }
    }

    let mut boundary: Vec<(usize, usize)> = Vec::new();
    let mut starts: HashMap<usize, Vec<usize>> = HashMap::new();
    for &f in members {
        for (a, b) in face_edges(faces[f]) {
            if counts.get(&edge_key(a, b)) == Some(&1) {
                starts.entry(a).or_default().push(boundary.len());
                boundary.push((a, b));
            }
        }
    }

    let mut used = vec![false; boundary.len()];
    let mut loops = Vec::new();
    for first in 0..boundary.len() {
        if used[first] {
            continue;
        }
        let origin = boundary[first].0;
        let mut ring = Vec::new();
        let mut cur = first;
        loop {
            used[cur] = true;
            let (a, b) = boundary[cur];
            ring.push(a);
            if b == origin {
                if ring.len() >= 3 {
                    loops.push(ring);
                }
                break;
            }
            let next = starts
                .get(&b)
                .and_then(|cands| cands.iter().copied().find(|&c| !used[c]));
            let Some(next) = next else {
                warn!(vertex = b, "open boundary chain while threading region loops");
                break;
            };
            cur = next;
        }
    }
    loops
}

/// Picks the loop whose bounding box encloses all the others as the outer
/// and keeps the rest as holes, confirmed by a point-in-polygon probe in
/// the region's plane.
fn classify_loops(
    model: &Model,
    loops: Vec<Vec<usize>>,
) -> Result<Option<(Vec<usize>, Vec<Vec<usize>>)>> {
    if loops.is_empty() {
        return Ok(None);
    }
    if loops.len() == 1 {
        let mut single = loops;
        return Ok(Some((single.swap_remove(0), Vec::new())));
    }

    let coords: Vec<Vec<Point3>> = loops
        .iter()
        .map(|ring| ring_coords(model, ring))
        .collect::<Result<_>>()?;
    let Some(normal) = coords.iter().find_map(|c| newell_normal(c).ok()) else {
        return Ok(None);
    };
    let basis = PlaneBasis::from_normal(normal)?;
    let planar: Vec<Vec<Point3>> = coords
        .iter()
        .map(|ring| ring.iter().map(|p| basis.to_plane(p)).collect())
        .collect();
    let boxes: Vec<[f64; 4]> = planar.iter().map(|ring| bounding_box(ring)).collect();

    let outer = (0..loops.len())
        .find(|&o| (0..loops.len()).all(|j| j == o || box_contains(&boxes[o], &boxes[j])));
    let Some(o) = outer else {
        warn!("no boundary loop encloses the others");
        return Ok(None);
    };

    let mut outer_ring = Vec::new();
    let mut holes = Vec::new();
    for (j, ring) in loops.into_iter().enumerate() {
        if j == o {
            outer_ring = ring;
        } else if point_in_polygon(&planar[j][0], &planar[o]) == PointLocation::Outside {
            warn!("dropping a boundary loop that lies outside the outer loop");
        } else {
            holes.push(ring);
        }
    }
    Ok(Some((outer_ring, holes)))
}

fn ring_coords(model: &Model, ring: &[usize]) -> Result<Vec<Point3>> {
    ring.iter().map(|&i| model.points.point(i).copied()).collect()
}

fn bounding_box(ring: &[Point3]) -> [f64; 4] {
    let mut b = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
    for p in ring {
        b[0] = b[0].min(p.x);
        b[1] = b[1].min(p.y);
        b[2] = b[2].max(p.x);
        b[3] = b[3].max(p.y);
    }
    b
}

fn box_contains(a: &[f64; 4], b: &[f64; 4]) -> bool {
    a[0] - TOLERANCE <= b[0]
        && a[1] - TOLERANCE <= b[1]
        && a[2] + TOLERANCE >= b[2]
        && a[3] + TOLERANCE >= b[3]
}
