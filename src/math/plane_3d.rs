use super::{Point3, Vector3, TOLERANCE};
use crate::error::{GeometryError, Result};

/// Computes the normal of a closed 3D polygon using Newell's method.
///
/// The normal points toward the side from which the loop winds
/// counter-clockwise. Robust against collinear runs and mild non-planarity.
///
/// # Errors
///
/// Returns `GeometryError::ZeroVector` if the loop is degenerate and no
/// normal direction can be determined.
pub fn newell_normal(points: &[Point3]) -> Result<Vector3> {
    let n = points.len();
    if n < 3 {
        return Err(GeometryError::ZeroVector.into());
    }
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    let len = normal.norm();
    if len < TOLERANCE {
        return Err(GeometryError::ZeroVector.into());
    }
    Ok(normal / len)
}

/// An orthonormal frame for mapping between world space and the coordinate
/// system of a plane through the origin with the given normal.
///
/// Plane coordinates are `(u, v, offset)` where `offset` is the signed
/// distance along the normal. The frame is right-handed, so a loop that winds
/// counter-clockwise viewed from the normal side stays counter-clockwise in
/// the UV plane.
#[derive(Debug, Clone, Copy)]
pub struct PlaneBasis {
    u_dir: Vector3,
    v_dir: Vector3,
    normal: Vector3,
}

impl PlaneBasis {
    /// Builds a basis from a plane normal.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ZeroVector` if the normal has zero length.
    pub fn from_normal(normal: Vector3) -> Result<Self> {
        let len = normal.norm();
        if len < TOLERANCE {
            return Err(GeometryError::ZeroVector.into());
        }
        let normal = normal / len;

        // Choose a reference vector not parallel to the normal
        let reference = if normal.x.abs() < 0.9 {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            Vector3::new(0.0, 1.0, 0.0)
        };

        let u_dir = normal.cross(&reference).normalize();
        let v_dir = normal.cross(&u_dir);

        Ok(Self {
            u_dir,
            v_dir,
            normal,
        })
    }

    /// Maps a world-space point into plane coordinates.
    #[must_use]
    pub fn to_plane(&self, p: &Point3) -> Point3 {
        Point3::new(
            p.coords.dot(&self.u_dir),
            p.coords.dot(&self.v_dir),
            p.coords.dot(&self.normal),
        )
    }

    /// Maps a plane-coordinate point back into world space.
    #[must_use]
    pub fn from_plane(&self, p: &Point3) -> Point3 {
        let w = self.u_dir * p.x + self.v_dir * p.y + self.normal * p.z;
        Point3::new(w.x, w.y, w.z)
    }

    /// Returns the plane normal.
    #[must_use]
    pub fn plane_normal(&self) -> &Vector3 {
        &self.normal
    }
}
