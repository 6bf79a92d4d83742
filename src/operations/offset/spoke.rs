use crate::error::Result;
use crate::math::polygon_2d::{left_normal, segment_direction};
use crate::math::{Point3, Vector3, TOLERANCE};

/// Cap applied to bisector speeds at needle-sharp corners.
pub(crate) const SPEED_CAP: f64 = 1.0 / TOLERANCE;

/// A corner of the shrinking boundary travelling along its interior
/// bisector.
///
/// `origin` is where the spoke starts and `dest` where its wavefront
/// generation ends (`dest` equals `origin` until the owning node closes).
/// `dir` is the unit travel direction in the XY plane and `speed` the
/// planar distance covered per unit of offset depth, so the corner sits at
/// `origin + dir * speed * t` after the wavefront has advanced by `t`.
#[derive(Debug, Clone, Copy)]
pub struct Spoke {
    pub origin: Point3,
    pub dest: Point3,
    pub dir: Vector3,
    pub speed: f64,
    pub reflex: bool,
}

impl Spoke {
    /// Planar velocity, z always zero.
    pub(crate) fn velocity(&self) -> Vector3 {
        Vector3::new(self.dir.x * self.speed, self.dir.y * self.speed, 0.0)
    }

    /// Position after advancing by `dt`, lifted by `vspeed` per unit depth.
    pub(crate) fn advanced(&self, dt: f64, vspeed: f64) -> Point3 {
        Point3::new(
            self.origin.x + self.dir.x * self.speed * dt,
            self.origin.y + self.dir.y * self.speed * dt,
            self.origin.z + vspeed * dt,
        )
    }
}

/// Builds one spoke per ring vertex.
///
/// The direction solves `d · n_in = d · n_out = 1` for the unit left
/// normals of the two incident edges, giving the interior bisector scaled
/// by the inverse sine of the half angle. Outer rings run counter-clockwise
/// and holes clockwise, so the same construction points every spoke into
/// the material. A corner is reflex when its edges turn clockwise.
/// Near-straight corners ride the shared edge normal at unit speed;
/// needle corners bisect the hairpin at the capped speed.
///
/// # Errors
///
/// Returns `GeometryError::Degenerate` if the ring contains a zero-length
/// edge.
pub(crate) fn build_spokes(ring: &[Point3]) -> Result<Vec<Spoke>> {
    let n = ring.len();
    let mut spokes = Vec::with_capacity(n);
    for i in 0..n {
        let prev = &ring[(i + n - 1) % n];
        let here = &ring[i];
        let next = &ring[(i + 1) % n];
        let u_in = segment_direction(prev, here)?;
        let u_out = segment_direction(here, next)?;
        let n_in = left_normal(u_in);
        let n_out = left_normal(u_out);
        let det = n_in.x * n_out.y - n_in.y * n_out.x;

        let (dir, speed, reflex) = if det.abs() <= TOLERANCE {
            if u_in.x * u_out.x + u_in.y * u_out.y > 0.0 {
                (n_in, 1.0, false)
            } else {
                let bx = u_out.x - u_in.x;
                let by = u_out.y - u_in.y;
                let len = (bx * bx + by * by).sqrt();
                (Vector3::new(bx / len, by / len, 0.0), SPEED_CAP, false)
            }
        } else {
            let dx = (n_out.y - n_in.y) / det;
            let dy = (n_in.x - n_out.x) / det;
            let len = (dx * dx + dy * dy).sqrt();
            (
                Vector3::new(dx / len, dy / len, 0.0),
                len.min(SPEED_CAP),
                det < -TOLERANCE,
            )
        };

        spokes.push(Spoke {
            origin: *here,
            dest: *here,
            dir,
            speed,
            reflex,
        });
    }
    Ok(spokes)
}
