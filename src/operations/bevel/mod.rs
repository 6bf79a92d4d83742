mod region;

pub use region::{detect_regions, Region};

use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

use tracing::{debug, warn};

use crate::error::{GeometryError, Result};
use crate::math::plane_3d::{newell_normal, PlaneBasis};
use crate::math::{Point3, TOLERANCE};
use crate::model::{FaceTag, Model, Points, PolyArea};
use crate::operations::offset::OffsetEngine;
use crate::tessellation::{quadrangulate, triangulate_face};

/// Knobs for [`BevelSelection`].
#[derive(Debug, Clone, Copy)]
pub struct BevelOptions {
    /// Inset distance, or a percentage of the maximal inset in percent mode.
    pub amount: f64,
    /// Wall slope in radians; 0 keeps the bevel in the face plane.
    pub pitch: f64,
    /// Pair residual cap triangles into quads where possible.
    pub quadrangulate: bool,
    /// Fuse edge-connected selected faces into regions first.
    pub region: bool,
    /// Interpret `amount` as a percentage of each region's collapse depth.
    pub as_percent: bool,
}

impl Default for BevelOptions {
    fn default() -> Self {
        Self {
            amount: 0.0,
            pitch: 0.0,
            quadrangulate: false,
            region: true,
            as_percent: false,
        }
    }
}

/// A non-fatal note about one region of a bevel run.
#[derive(Debug, Clone)]
pub struct RegionDiagnostic {
    /// Region index in detection order.
    pub region: usize,
    /// Human-readable description of what was skipped or degraded.
    pub message: String,
}

/// Summary of a bevel run.
#[derive(Debug, Clone, Default)]
pub struct BevelOutcome {
    /// Faces appended to the model.
    pub faces_added: usize,
    /// Regions abandoned entirely.
    pub regions_skipped: usize,
    /// Per-region notes, one entry per skip or degradation.
    pub diagnostics: Vec<RegionDiagnostic>,
}

/// Bevels a set of selected faces in place.
///
/// Each selected face (or fused region of faces) is rotated into its own
/// plane, inset by the requested amount, and replaced on the way out by
/// the swept side walls plus a tessellated residual cap. Only new faces
/// are appended; deleting the originals is the caller's decision.
pub struct BevelSelection {
    selected: Vec<usize>,
    options: BevelOptions,
}

impl BevelSelection {
    /// Creates a new `BevelSelection` operation.
    #[must_use]
    pub fn new(selected: Vec<usize>, options: BevelOptions) -> Self {
        Self { selected, options }
    }

    /// Executes the bevel, appending walls and caps to the model.
    ///
    /// A failing region is skipped with a diagnostic and leaves the model's
    /// faces untouched; the run keeps going.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::ParameterOutOfRange` for a pitch outside
    /// `[0, pi/2)` and `ModelError` variants when the selection references
    /// missing faces or points.
    pub fn execute(&self, model: &mut Model) -> Result<BevelOutcome> {
        let mut outcome = BevelOutcome::default();
        if self.options.amount <= 0.0 {
            debug!(amount = self.options.amount, "bevel amount not positive, nothing to do");
            return Ok(outcome);
        }
        if !self.options.pitch.is_finite()
            || self.options.pitch < 0.0
            || self.options.pitch >= FRAC_PI_2
        {
            return Err(GeometryError::ParameterOutOfRange {
                parameter: "pitch",
                value: self.options.pitch,
                min: 0.0,
                max: FRAC_PI_2,
            }
            .into());
        }

        let regions = if self.options.region {
            detect_regions(model, &self.selected)?
        } else {
            let mut singles = Vec::with_capacity(self.selected.len());
            for &index in &self.selected {
                singles.push(Region {
                    outer: model.face(index)?.to_vec(),
                    holes: Vec::new(),
                    tag: model.face_tag(index)?,
                });
            }
            singles
        };

        for (ri, region) in regions.iter().enumerate() {
            match bevel_region(model, region, &self.options) {
                Ok(produced) => {
                    for note in produced.notes {
                        debug!(region = ri, note = %note, "bevel region degraded");
                        outcome.diagnostics.push(RegionDiagnostic {
                            region: ri,
                            message: note,
                        });
                    }
                    for (verts, tag) in produced.faces {
                        let mut face = Vec::with_capacity(verts.len());
                        for vert in verts {
                            face.push(match vert {
                                SpliceVertex::Existing(index) => index,
                                SpliceVertex::New(point) => model.points.add(point),
                            });
                        }
                        model.add_face(face, tag)?;
                        outcome.faces_added += 1;
                    }
                }
                Err(err) => {
                    warn!(region = ri, error = %err, "skipping bevel region");
                    outcome.regions_skipped += 1;
                    outcome.diagnostics.push(RegionDiagnostic {
                        region: ri,
                        message: err.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }
}

/// One vertex of a face headed back into the caller's model.
///
/// Input boundary vertices keep their caller-pool index: a plane-basis
/// round trip re-rounds the coordinates and on a tilted plane can land
/// one pool quantum away from the original point.
enum SpliceVertex {
    Existing(usize),
    New(Point3),
}

/// Faces one region contributes, plus degradation notes. Nothing is
/// spliced into the caller's model until the whole region has succeeded.
struct RegionFaces {
    faces: Vec<(Vec<SpliceVertex>, FaceTag)>,
    notes: Vec<String>,
}

fn bevel_region(model: &Model, region: &Region, options: &BevelOptions) -> Result<RegionFaces> {
    let outer_coords = ring_coords(model, &region.outer)?;
    let normal = newell_normal(&outer_coords)?;
    let basis = PlaneBasis::from_normal(normal)?;

    let mut pool = Points::new();
    let mut to_model = HashMap::new();
    let mut outer = Vec::with_capacity(region.outer.len());
    for (&index, p) in region.outer.iter().zip(&outer_coords) {
        let local = pool.add(basis.to_plane(p));
        to_model.entry(local).or_insert(index);
        outer.push(local);
    }
    let mut hole_rings = Vec::with_capacity(region.holes.len());
    for ring in &region.holes {
        let coords = ring_coords(model, ring)?;
        let mut hole = Vec::with_capacity(ring.len());
        for (&index, p) in ring.iter().zip(&coords) {
            let local = pool.add(basis.to_plane(p));
            to_model.entry(local).or_insert(index);
            hole.push(local);
        }
        hole_rings.push(hole);
    }
    let mut area = PolyArea::new(pool, outer);
    for hole in hole_rings {
        area.add_hole(hole);
    }
    area.tag = region.tag;

    let mut notes = Vec::new();
    let distance = if options.as_percent {
        let probe = OffsetEngine::new(area.clone(), 0.0, 1.0)?;
        options.amount / 100.0 * probe.collapse_time()?
    } else {
        options.amount
    };
    if distance <= TOLERANCE {
        notes.push(format!("inset distance {distance} below tolerance, nothing to do"));
        return Ok(RegionFaces {
            faces: Vec::new(),
            notes,
        });
    }

    let result = OffsetEngine::new(area, options.pitch, distance)?.execute()?;

    let mut faces = Vec::new();
    for wall in &result.side_walls {
        faces.push((splice_ring(&result.points, wall, &basis, &to_model)?, region.tag));
    }
    for residual in &result.inner_polyareas {
        match triangulate_face(residual) {
            Ok(triangles) => {
                if options.quadrangulate {
                    for quad in quadrangulate(&residual.pool, &triangles) {
                        faces.push((
                            splice_ring(&residual.pool, &quad, &basis, &to_model)?,
                            region.tag,
                        ));
                    }
                } else {
                    for tri in &triangles {
                        faces.push((
                            splice_ring(&residual.pool, tri, &basis, &to_model)?,
                            region.tag,
                        ));
                    }
                }
            }
            Err(err) => {
                notes.push(format!("residual cap kept as a plain polygon: {err}"));
                if !residual.holes().is_empty() {
                    notes.push(format!(
                        "dropped {} hole(s) of an untessellated cap",
                        residual.holes().len()
                    ));
                }
                faces.push((
                    splice_ring(&residual.pool, residual.outer(), &basis, &to_model)?,
                    region.tag,
                ));
            }
        }
    }
    Ok(RegionFaces { faces, notes })
}

fn ring_coords(model: &Model, ring: &[usize]) -> Result<Vec<Point3>> {
    ring.iter().map(|&i| model.points.point(i).copied()).collect()
}

/// Lifts a ring of sweep-pool indices back to caller-facing vertices,
/// keeping input boundary vertices by identity.
fn splice_ring(
    points: &Points,
    ring: &[usize],
    basis: &PlaneBasis,
    to_model: &HashMap<usize, usize>,
) -> Result<Vec<SpliceVertex>> {
    ring.iter()
        .map(|&i| -> Result<SpliceVertex> {
            Ok(match to_model.get(&i) {
                Some(&index) => SpliceVertex::Existing(index),
                None => SpliceVertex::New(basis.from_plane(points.point(i)?)),
            })
        })
        .collect()
}
