use std::cmp::Reverse;
use std::collections::BinaryHeap;

use slotmap::SecondaryMap;
use tracing::{debug, warn};

use crate::error::{OffsetError, Result};
use crate::math::polygon_2d::{point_in_polygon, point_on_segment_2d, signed_area_2d, PointLocation};
use crate::math::{Point3, TOLERANCE};
use crate::model::{FaceTag, Points, PolyArea};

use super::event::{edge_collapse_time, split_hit_time, Event, EventKind};
use super::spoke::{build_spokes, Spoke};
use super::{OffsetNode, OffsetNodeId, OffsetResult, OffsetTree};

/// A live wavefront vertex: the pool index it started from plus the spoke
/// carrying it.
struct ActiveVert {
    origin: usize,
    spoke: Spoke,
}

/// One leaf of the offset tree still being advanced.
struct ActiveNode {
    time: f64,
    rings: Vec<Vec<ActiveVert>>,
}

/// A materialised vertex inside one event batch. `parent` names the ring
/// slot it came from, so queued events can find it after the rings have
/// been reshaped; vertices minted by splits carry no parent.
#[derive(Debug, Clone, Copy)]
struct WorkVert {
    pool: usize,
    parent: Option<(usize, usize)>,
}

/// The shrinking-boundary sweep behind [`super::OffsetEngine`].
///
/// Rings advance continuously between topology changes; the queue holds
/// predicted edge collapses and reflex splits. Every batch of events within
/// one tolerance window closes the affected node: all of its spokes are
/// materialised through the shared pool (rounding unifies meeting corners),
/// pinches are resolved, splits and splices applied, and each surviving
/// counter-clockwise ring founds a child node.
pub(crate) struct Wavefront {
    pool: Points,
    tag: FaceTag,
    target: f64,
    vspeed: f64,
    tree: OffsetTree,
    active: SecondaryMap<OffsetNodeId, ActiveNode>,
    queue: BinaryHeap<Reverse<Event>>,
    side_walls: Vec<Vec<usize>>,
    first_collapse: Option<f64>,
    last_event_time: Option<f64>,
    budget: usize,
    spent: usize,
}

impl Wavefront {
    /// Builds the root wavefront from a planar area.
    ///
    /// Rings are deduplicated and reoriented (outer counter-clockwise,
    /// holes clockwise); degenerate holes are skipped.
    ///
    /// # Errors
    ///
    /// Returns `OffsetError::DegenerateArea` if the outer ring has fewer
    /// than three distinct vertices or encloses no area.
    pub(crate) fn new(area: PolyArea, pitch: f64, target: f64) -> Result<Self> {
        let outer_idx = dedup_cyclic(area.outer().to_vec(), |&i| i);
        let hole_idx: Vec<Vec<usize>> = area
            .holes()
            .iter()
            .map(|h| dedup_cyclic(h.clone(), |&i| i))
            .collect();
        let tag = area.tag;
        let pool = area.pool;

        if outer_idx.len() < 3 {
            return Err(OffsetError::DegenerateArea.into());
        }
        let coords = ring_coords(&pool, &outer_idx)?;
        let outer_area = signed_area_2d(&coords);
        if outer_area.abs() <= TOLERANCE {
            return Err(OffsetError::DegenerateArea.into());
        }
        let mut rings_idx = Vec::with_capacity(1 + hole_idx.len());
        let mut outer = outer_idx;
        if outer_area < 0.0 {
            outer.reverse();
        }
        rings_idx.push(outer);
        for mut hole in hole_idx {
            if hole.len() < 3 {
                debug!(len = hole.len(), "skipping degenerate hole ring");
                continue;
            }
            let coords = ring_coords(&pool, &hole)?;
            let hole_area = signed_area_2d(&coords);
            if hole_area.abs() <= TOLERANCE {
                debug!("skipping zero-area hole ring");
                continue;
            }
            if hole_area > 0.0 {
                hole.reverse();
            }
            rings_idx.push(hole);
        }

        let input_verts: usize = rings_idx.iter().map(Vec::len).sum();
        let budget = 10 * input_verts * input_verts + 1000;

        let mut rings = Vec::with_capacity(rings_idx.len());
        let mut spoke_rings = Vec::with_capacity(rings_idx.len());
        for ring in &rings_idx {
            let coords = ring_coords(&pool, ring)?;
            let spokes = build_spokes(&coords)?;
            spoke_rings.push(spokes.clone());
            rings.push(
                ring.iter()
                    .zip(spokes)
                    .map(|(&origin, spoke)| ActiveVert { origin, spoke })
                    .collect(),
            );
        }

        let tree = OffsetTree::with_root(OffsetNode {
            time: 0.0,
            end_time: 0.0,
            rings: spoke_rings,
            children: Vec::new(),
        });
        let mut active = SecondaryMap::new();
        active.insert(tree.root(), ActiveNode { time: 0.0, rings });

        let mut wavefront = Self {
            pool,
            tag,
            target,
            vspeed: pitch.tan(),
            tree,
            active,
            queue: BinaryHeap::new(),
            side_walls: Vec::new(),
            first_collapse: None,
            last_event_time: None,
            budget,
            spent: 0,
        };
        let root = wavefront.tree.root();
        wavefront.predict(root);
        Ok(wavefront)
    }

    /// Time at which a ring first shrank to nothing, if one has.
    pub(crate) fn first_collapse(&self) -> Option<f64> {
        self.first_collapse
    }

    /// Processes the next batch of events.
    ///
    /// Returns `Ok(false)` once no event remains within reach of the
    /// target depth.
    ///
    /// # Errors
    ///
    /// Returns `OffsetError::IterationLimit` if the run exceeds its event
    /// budget.
    pub(crate) fn advance(&mut self) -> Result<bool> {
        let t_star = loop {
            let Some(Reverse(head)) = self.queue.peek() else {
                return Ok(false);
            };
            if head.time > self.target + TOLERANCE {
                return Ok(false);
            }
            if self.active.contains_key(head.node) {
                break head.time;
            }
            self.queue.pop();
        };

        let mut batch: Vec<Event> = Vec::new();
        while let Some(Reverse(head)) = self.queue.peek() {
            if head.time > t_star + TOLERANCE {
                break;
            }
            if let Some(Reverse(ev)) = self.queue.pop() {
                if self.active.contains_key(ev.node) {
                    batch.push(ev);
                }
            }
        }
        self.spent += batch.len();
        if self.spent > self.budget {
            return Err(OffsetError::IterationLimit { cap: self.budget }.into());
        }
        self.last_event_time = Some(t_star);
        debug!(time = t_star, events = batch.len(), "processing wavefront batch");

        let mut order: Vec<OffsetNodeId> = Vec::new();
        for ev in &batch {
            if !order.contains(&ev.node) {
                order.push(ev.node);
            }
        }
        for node in order {
            let splits: Vec<Event> = batch
                .iter()
                .filter(|e| e.node == node && matches!(e.kind, EventKind::Split { .. }))
                .copied()
                .collect();
            self.close_node(node, t_star, &splits)?;
        }
        Ok(true)
    }

    /// Materialises the surviving leaves at the target depth and assembles
    /// the run's result.
    pub(crate) fn finish(mut self) -> Result<OffsetResult> {
        let ids: Vec<OffsetNodeId> = self.active.keys().collect();
        let alive = !ids.is_empty();
        let mut residuals: Vec<(Vec<usize>, Vec<Vec<usize>>)> = Vec::new();

        for id in ids {
            let Some(state) = self.active.remove(id) else {
                continue;
            };
            let dt = (self.target - state.time).max(0.0);
            let mut dests: Vec<Vec<usize>> = Vec::with_capacity(state.rings.len());
            for ring in &state.rings {
                let mut dr = Vec::with_capacity(ring.len());
                for vert in ring {
                    dr.push(self.pool.add(vert.spoke.advanced(dt, self.vspeed)));
                }
                dests.push(dr);
            }
            self.seal_node(id, self.target, &state, &dests)?;

            let mut rings_idx = dests.into_iter().map(|r| dedup_cyclic(r, |&i| i));
            let Some(outer) = rings_idx.next() else {
                continue;
            };
            if outer.len() < 3 {
                warn!("terminal ring degenerated at the target depth");
                continue;
            }
            let outer_coords = ring_coords(&self.pool, &outer)?;
            if signed_area_2d(&outer_coords) <= TOLERANCE {
                warn!("terminal ring degenerated at the target depth");
                continue;
            }
            let mut holes = Vec::new();
            for hole in rings_idx {
                if hole.len() < 3 {
                    continue;
                }
                let coords = ring_coords(&self.pool, &hole)?;
                if signed_area_2d(&coords) < -TOLERANCE {
                    holes.push(hole);
                }
            }
            residuals.push((outer, holes));
        }

        let end_time = if alive {
            self.target
        } else {
            self.last_event_time.unwrap_or(0.0)
        };
        let inner_polyareas = residuals
            .into_iter()
            .map(|(outer, holes)| {
                let mut pa = PolyArea::new(self.pool.clone(), outer);
                for hole in holes {
                    pa.add_hole(hole);
                }
                pa.tag = self.tag;
                pa
            })
            .collect();

        Ok(OffsetResult {
            points: self.pool,
            side_walls: self.side_walls,
            inner_polyareas,
            end_time,
            first_collapse: self.first_collapse,
            tree: self.tree,
        })
    }

    /// Predicts edge collapses and reflex splits for a freshly spawned node.
    fn predict(&mut self, id: OffsetNodeId) {
        let mut events = Vec::new();
        if let Some(state) = self.active.get(id) {
            let t0 = state.time;
            for (r, ring) in state.rings.iter().enumerate() {
                let n = ring.len();
                for i in 0..n {
                    let j = (i + 1) % n;
                    let (a, b) = (&ring[i].spoke, &ring[j].spoke);
                    if let Some(dt) =
                        edge_collapse_time(&a.origin, &a.velocity(), &b.origin, &b.velocity())
                    {
                        events.push(Event {
                            time: t0 + dt,
                            node: id,
                            kind: EventKind::EdgeCollapse { ring: r, idx: i },
                        });
                    }
                }
            }
            for (r, ring) in state.rings.iter().enumerate() {
                for (i, vert) in ring.iter().enumerate() {
                    if !vert.spoke.reflex {
                        continue;
                    }
                    let o = &vert.spoke.origin;
                    let v = vert.spoke.velocity();
                    let mut soonest: Option<f64> = None;
                    for (r2, ring2) in state.rings.iter().enumerate() {
                        let m = ring2.len();
                        for k in 0..m {
                            let k1 = (k + 1) % m;
                            if r2 == r && (k == i || k1 == i) {
                                continue;
                            }
                            let (p0, p1) = (&ring2[k].spoke, &ring2[k1].spoke);
                            if let Some(dt) = split_hit_time(
                                o,
                                &v,
                                &p0.origin,
                                &p0.velocity(),
                                &p1.origin,
                                &p1.velocity(),
                            ) {
                                if soonest.is_none_or(|s| dt < s) {
                                    soonest = Some(dt);
                                }
                            }
                        }
                    }
                    if let Some(dt) = soonest {
                        events.push(Event {
                            time: t0 + dt,
                            node: id,
                            kind: EventKind::Split { ring: r, idx: i },
                        });
                    }
                }
            }
        }
        self.queue.extend(events.into_iter().map(Reverse));
    }

    /// Closes a node at `t_star`: materialise, emit walls, reshape rings,
    /// spawn children.
    fn close_node(&mut self, id: OffsetNodeId, t_star: f64, splits: &[Event]) -> Result<()> {
        let Some(state) = self.active.remove(id) else {
            return Ok(());
        };
        let dt = (t_star - state.time).max(0.0);

        let mut work: Vec<Vec<WorkVert>> = Vec::with_capacity(state.rings.len());
        let mut dests: Vec<Vec<usize>> = Vec::with_capacity(state.rings.len());
        for (r, ring) in state.rings.iter().enumerate() {
            let mut wr = Vec::with_capacity(ring.len());
            let mut dr = Vec::with_capacity(ring.len());
            for (i, vert) in ring.iter().enumerate() {
                let idx = self.pool.add(vert.spoke.advanced(dt, self.vspeed));
                wr.push(WorkVert {
                    pool: idx,
                    parent: Some((r, i)),
                });
                dr.push(idx);
            }
            work.push(wr);
            dests.push(dr);
        }
        self.seal_node(id, t_star, &state, &dests)?;

        let mut rings: Vec<Vec<WorkVert>> = work
            .into_iter()
            .map(|r| dedup_cyclic(r, |v| v.pool))
            .collect();
        rings = resolve_pinches(rings);
        for ev in splits {
            self.apply_split(&mut rings, ev);
        }
        self.spawn_children(id, t_star, rings)
    }

    /// Records the node's end state in the tree and emits its side walls,
    /// one quad per advanced edge (collapsed edges shed duplicate corners).
    fn seal_node(
        &mut self,
        id: OffsetNodeId,
        t_end: f64,
        state: &ActiveNode,
        dests: &[Vec<usize>],
    ) -> Result<()> {
        if let Some(node) = self.tree.get_mut(id) {
            node.end_time = t_end;
            for (r, ring) in node.rings.iter_mut().enumerate() {
                for (i, spoke) in ring.iter_mut().enumerate() {
                    spoke.dest = *self.pool.point(dests[r][i])?;
                }
            }
        }
        for (r, ring) in state.rings.iter().enumerate() {
            let n = ring.len();
            for i in 0..n {
                let j = (i + 1) % n;
                let quad = vec![ring[i].origin, ring[j].origin, dests[r][j], dests[r][i]];
                let face = dedup_cyclic(quad, |&v| v);
                if face.len() >= 3 {
                    self.side_walls.push(face);
                }
            }
        }
        Ok(())
    }

    /// Re-locates a queued split against the current rings and applies it:
    /// a hit within the source's own ring cuts it in two, a hit on another
    /// ring splices the pair into one.
    fn apply_split(&self, rings: &mut Vec<Vec<WorkVert>>, ev: &Event) {
        let EventKind::Split { ring: pr, idx: pi } = ev.kind else {
            return;
        };
        let mut source = None;
        'place: for (r, ring) in rings.iter().enumerate() {
            for (i, vert) in ring.iter().enumerate() {
                if vert.parent == Some((pr, pi)) {
                    source = Some((r, i));
                    break 'place;
                }
            }
        }
        let Some((sr, si)) = source else {
            debug!(ring = pr, idx = pi, "split spoke vanished before application");
            return;
        };
        let src_pool = rings[sr][si].pool;
        let coords = self.pool.coords();
        let h = coords[src_pool];

        let mut target = None;
        'scan: for (r, ring) in rings.iter().enumerate() {
            let n = ring.len();
            if n < 3 {
                continue;
            }
            for k in 0..n {
                let k1 = (k + 1) % n;
                if r == sr && (k == si || k1 == si) {
                    continue;
                }
                let (a, b) = (&ring[k], &ring[k1]);
                if a.pool == src_pool || b.pool == src_pool {
                    continue;
                }
                if point_on_segment_2d(&h, &coords[a.pool], &coords[b.pool]) {
                    target = Some((r, k));
                    break 'scan;
                }
            }
        }
        let Some((tr, tk)) = target else {
            debug!(ring = pr, idx = pi, "split target edge vanished before application");
            return;
        };

        if tr == sr {
            let ring = std::mem::take(&mut rings[sr]);
            let n = ring.len();
            let mut first = vec![WorkVert {
                pool: src_pool,
                parent: None,
            }];
            let mut i = (tk + 1) % n;
            while i != si {
                first.push(ring[i]);
                i = (i + 1) % n;
            }
            let mut second = vec![ring[si]];
            let mut i = (si + 1) % n;
            loop {
                second.push(ring[i]);
                if i == tk {
                    break;
                }
                i = (i + 1) % n;
            }
            debug!(time = ev.time, "splitting a ring into two wavefronts");
            rings[sr] = first;
            rings.push(second);
        } else {
            let absorbed = rings.remove(sr);
            let tr = if sr < tr { tr - 1 } else { tr };
            let host = std::mem::take(&mut rings[tr]);
            let m = absorbed.len();
            let mut merged = host[..=tk].to_vec();
            for off in 0..m {
                merged.push(absorbed[(si + off) % m]);
            }
            merged.push(WorkVert {
                pool: src_pool,
                parent: None,
            });
            merged.extend_from_slice(&host[tk + 1..]);
            debug!(time = ev.time, "splicing two wavefront rings into one");
            rings[tr] = merged;
        }
    }

    /// Classifies the post-batch rings and founds one child per surviving
    /// outer, with every hole attached to its smallest containing outer.
    fn spawn_children(
        &mut self,
        parent: OffsetNodeId,
        t_star: f64,
        rings: Vec<Vec<WorkVert>>,
    ) -> Result<()> {
        let mut outers: Vec<(Vec<WorkVert>, Vec<Point3>, f64)> = Vec::new();
        let mut holes: Vec<(Vec<WorkVert>, Vec<Point3>, f64)> = Vec::new();
        let mut any_died = false;
        for ring in rings {
            if ring.len() < 3 {
                any_died = true;
                continue;
            }
            let coords: Vec<Point3> = ring.iter().map(|v| self.pool.coords()[v.pool]).collect();
            let ring_area = signed_area_2d(&coords);
            if ring_area.abs() <= TOLERANCE {
                any_died = true;
                continue;
            }
            if ring_area > 0.0 {
                outers.push((ring, coords, ring_area));
            } else {
                holes.push((ring, coords, ring_area));
            }
        }

        let total: f64 = outers.iter().map(|(_, _, a)| a).sum::<f64>()
            + holes.iter().map(|(_, _, a)| a).sum::<f64>();
        if outers.is_empty() || total <= TOLERANCE {
            self.first_collapse.get_or_insert(t_star);
            debug!(time = t_star, "wavefront region fully collapsed");
            return Ok(());
        }
        if any_died {
            self.first_collapse.get_or_insert(t_star);
        }

        let mut assigned: Vec<Vec<(Vec<WorkVert>, Vec<Point3>)>> = vec![Vec::new(); outers.len()];
        for (ring, coords, hole_area) in holes {
            let probe = coords[0];
            let mut best: Option<(usize, f64)> = None;
            for (oi, (_, ocoords, oarea)) in outers.iter().enumerate() {
                if point_in_polygon(&probe, ocoords) == PointLocation::Inside
                    && best.is_none_or(|(_, a)| *oarea < a)
                {
                    best = Some((oi, *oarea));
                }
            }
            if let Some((oi, _)) = best {
                assigned[oi].push((ring, coords));
            } else {
                warn!(area = hole_area, "dropping hole outside every outer ring");
                self.first_collapse.get_or_insert(t_star);
            }
        }

        for (oi, (oring, ocoords, _)) in outers.into_iter().enumerate() {
            let mut ring_data = vec![(oring, ocoords)];
            ring_data.append(&mut assigned[oi]);

            let mut active_rings = Vec::with_capacity(ring_data.len());
            let mut spoke_rings = Vec::with_capacity(ring_data.len());
            for (ring, coords) in ring_data {
                let spokes = build_spokes(&coords)?;
                spoke_rings.push(spokes.clone());
                active_rings.push(
                    ring.iter()
                        .zip(spokes)
                        .map(|(v, spoke)| ActiveVert {
                            origin: v.pool,
                            spoke,
                        })
                        .collect(),
                );
            }

            let child = self.tree.insert(OffsetNode {
                time: t_star,
                end_time: t_star,
                rings: spoke_rings,
                children: Vec::new(),
            });
            if let Some(node) = self.tree.get_mut(parent) {
                node.children.push(child);
            }
            self.active.insert(
                child,
                ActiveNode {
                    time: t_star,
                    rings: active_rings,
                },
            );
            self.spent += 1;
            if self.spent > self.budget {
                return Err(OffsetError::IterationLimit { cap: self.budget }.into());
            }
            self.predict(child);
        }
        Ok(())
    }
}

// ── ring utilities ──

fn ring_coords(pool: &Points, ring: &[usize]) -> Result<Vec<Point3>> {
    ring.iter().map(|&i| pool.point(i).copied()).collect()
}

/// Drops consecutive entries with equal keys, treating the list as a cycle.
fn dedup_cyclic<T, K: PartialEq>(items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if out.last().is_none_or(|last| key(last) != key(&item)) {
            out.push(item);
        }
    }
    while out.len() > 1 && key(&out[0]) == key(&out[out.len() - 1]) {
        out.pop();
    }
    out
}

/// Splits rings at vertices that appear twice non-consecutively (the two
/// duplicates are a pinch: the ring touches itself there). Each half keeps
/// one copy of the shared vertex.
fn resolve_pinches(rings: Vec<Vec<WorkVert>>) -> Vec<Vec<WorkVert>> {
    let mut pending = rings;
    let mut i = 0;
    while i < pending.len() {
        if let Some((a, b)) = first_pinch(&pending[i]) {
            let ring = pending.remove(i);
            let mut rest = ring[b..].to_vec();
            rest.extend_from_slice(&ring[..a]);
            pending.insert(i, ring[a..b].to_vec());
            pending.insert(i + 1, rest);
        } else {
            i += 1;
        }
    }
    pending
}

fn first_pinch(ring: &[WorkVert]) -> Option<(usize, usize)> {
    let n = ring.len();
    for a in 0..n {
        for b in (a + 2)..n {
            if a == 0 && b == n - 1 {
                continue;
            }
            if ring[a].pool == ring[b].pool {
                return Some((a, b));
            }
        }
    }
    None
}
