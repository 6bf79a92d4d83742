use std::cmp::Ordering;

use crate::math::{Point3, Vector3, TOLERANCE};

use super::OffsetNodeId;

/// A predicted wavefront topology change, ordered by time for the queue.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Event {
    pub time: f64,
    pub node: OffsetNodeId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum EventKind {
    /// The ring edge starting at vertex `idx` shrinks to a point.
    EdgeCollapse { ring: usize, idx: usize },
    /// The reflex spoke at vertex `idx` runs into a non-adjacent edge.
    Split { ring: usize, idx: usize },
}

impl EventKind {
    fn order_key(self) -> (u8, usize, usize) {
        match self {
            EventKind::EdgeCollapse { ring, idx } => (0, ring, idx),
            EventKind::Split { ring, idx } => (1, ring, idx),
        }
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .partial_cmp(&other.time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.node.cmp(&other.node))
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
    }
}

/// Time until the edge from `a` to `b` contracts to a point, if it does.
///
/// The endpoint separation `e(dt) = e0 + de * dt` is smallest at
/// `dt = -(e0 . de) / (de . de)`; the edge collapses when that minimum
/// lands within tolerance of zero at a non-negative time. Endpoint pairs
/// sharing a velocity translate rigidly and never collapse.
pub(crate) fn edge_collapse_time(
    a_pos: &Point3,
    a_vel: &Vector3,
    b_pos: &Point3,
    b_vel: &Vector3,
) -> Option<f64> {
    let e0x = b_pos.x - a_pos.x;
    let e0y = b_pos.y - a_pos.y;
    let dex = b_vel.x - a_vel.x;
    let dey = b_vel.y - a_vel.y;
    let de_sq = dex * dex + dey * dey;
    if de_sq <= TOLERANCE * TOLERANCE {
        return None;
    }
    let dt = -(e0x * dex + e0y * dey) / de_sq;
    if dt < 0.0 {
        return None;
    }
    let rx = e0x + dex * dt;
    let ry = e0y + dey * dt;
    if (rx * rx + ry * ry).sqrt() > TOLERANCE {
        return None;
    }
    Some(dt)
}

/// Time until the moving point `o` (velocity `v`) lands on the advancing
/// edge `p0`-`p1`, whose endpoints travel at `v0` and `v1`.
///
/// The edge front slides inward at unit rate along its left normal while
/// staying parallel to itself, so the contact time solves
/// `n_e . (o + v * dt - p0) = dt`. The hit must fall within the advanced
/// segment, endpoints included. Contacts sooner than the time epsilon are
/// ignored so the pinch left behind by a fresh split cannot re-fire.
pub(crate) fn split_hit_time(
    o: &Point3,
    v: &Vector3,
    p0: &Point3,
    v0: &Vector3,
    p1: &Point3,
    v1: &Vector3,
) -> Option<f64> {
    let ex = p1.x - p0.x;
    let ey = p1.y - p0.y;
    let len = (ex * ex + ey * ey).sqrt();
    if len <= TOLERANCE {
        return None;
    }
    let ux = ex / len;
    let uy = ey / len;
    let nx = -uy;
    let ny = ux;

    let denom = nx * v.x + ny * v.y - 1.0;
    if denom.abs() <= TOLERANCE {
        return None;
    }
    let dt = (nx * (p0.x - o.x) + ny * (p0.y - o.y)) / denom;
    if !dt.is_finite() || dt <= TOLERANCE {
        return None;
    }

    let hx = o.x + v.x * dt;
    let hy = o.y + v.y * dt;
    let q0x = p0.x + v0.x * dt;
    let q0y = p0.y + v0.y * dt;
    let q1x = p1.x + v1.x * dt;
    let q1y = p1.y + v1.y * dt;
    let s = (hx - q0x) * ux + (hy - q0y) * uy;
    let advanced_len = (q1x - q0x) * ux + (q1y - q0y) * uy;
    if advanced_len < TOLERANCE || s < -TOLERANCE || s > advanced_len + TOLERANCE {
        return None;
    }
    Some(dt)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point3 {
        Point3::new(x, y, 0.0)
    }

    fn v(x: f64, y: f64) -> Vector3 {
        Vector3::new(x, y, 0.0)
    }

    #[test]
    fn unit_square_bottom_edge_collapses_at_half() {
        let dt =
            edge_collapse_time(&p(0.0, 0.0), &v(1.0, 1.0), &p(1.0, 0.0), &v(-1.0, 1.0)).unwrap();
        assert!((dt - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn rigidly_translating_edge_never_collapses() {
        assert!(
            edge_collapse_time(&p(0.0, 0.0), &v(0.0, 1.0), &p(1.0, 0.0), &v(0.0, 1.0)).is_none()
        );
    }

    #[test]
    fn diverging_endpoints_never_collapse() {
        assert!(
            edge_collapse_time(&p(0.0, 0.0), &v(-1.0, 0.0), &p(1.0, 0.0), &v(1.0, 0.0)).is_none()
        );
    }

    #[test]
    fn notch_vertex_splits_the_bottom_edge() {
        let root2 = 2.0_f64.sqrt();
        let dt = split_hit_time(
            &p(2.0, 1.0),
            &v(0.0, -root2),
            &p(0.0, 0.0),
            &v(1.0, 1.0),
            &p(4.0, 0.0),
            &v(-1.0, 1.0),
        )
        .unwrap();
        assert!((dt - (root2 - 1.0)).abs() < TOLERANCE);
    }

    #[test]
    fn hit_beyond_the_advanced_segment_is_rejected() {
        let root2 = 2.0_f64.sqrt();
        assert!(split_hit_time(
            &p(10.0, 1.0),
            &v(0.0, -root2),
            &p(0.0, 0.0),
            &v(1.0, 1.0),
            &p(4.0, 0.0),
            &v(-1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn vertex_riding_parallel_to_the_front_never_lands() {
        assert!(split_hit_time(
            &p(0.3, 0.3),
            &v(-1.0, -1.0),
            &p(1.0, 1.0),
            &v(-1.0, -1.0),
            &p(0.0, 1.0),
            &v(1.0, -1.0),
        )
        .is_none());
    }

    #[test]
    fn events_order_by_time_then_kind() {
        let node = OffsetNodeId::default();
        let early = Event {
            time: 0.25,
            node,
            kind: EventKind::Split { ring: 0, idx: 2 },
        };
        let late = Event {
            time: 0.5,
            node,
            kind: EventKind::EdgeCollapse { ring: 0, idx: 0 },
        };
        let tied = Event {
            time: 0.25,
            node,
            kind: EventKind::EdgeCollapse { ring: 0, idx: 1 },
        };
        assert!(early < late);
        assert!(tied < early);
    }
}
